//! Tableau Server HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). JSON is requested
//! for every metadata call; image and data exports return raw bytes.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use vizdash_config::TableauConfig;

use crate::auth::PatCredentials;
use crate::error::TableauError;
use crate::model::{
    extract_error, parse_pagination, parse_rest_api_version, parse_session, parse_views,
    parse_workbooks, Session, ViewItem, WorkbookItem,
};
use crate::session::ServerApi;

/// Version used for the unauthenticated `serverinfo` probe. Every server
/// since 10.1 answers it.
pub const NEGOTIATION_VERSION: &str = "2.4";

/// Items requested per page when listing workbooks.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

const AUTH_HEADER: &str = "X-Tableau-Auth";
const USER_AGENT: &str = concat!("vizdash/", env!("CARGO_PKG_VERSION"));

/// Tableau REST client (blocking).
pub struct TableauClient {
    http: reqwest::blocking::Client,
    server_url: String,
    credentials: PatCredentials,
    /// Pinned or negotiated REST API version
    api_version: OnceLock<String>,
    page_size: u64,
}

impl TableauClient {
    /// Create a client from resolved configuration.
    pub fn from_config(config: &TableauConfig) -> Result<Self, TableauError> {
        let credentials = PatCredentials::new(
            config.token_name.clone(),
            config.token_secret.clone(),
            config.site_id.clone(),
        );
        Self::new(&config.server_url, credentials, config.api_version.clone())
    }

    /// Create a client for `server_url`. With `api_version = None` the
    /// version is negotiated on first use.
    pub fn new(
        server_url: &str,
        credentials: PatCredentials,
        api_version: Option<String>,
    ) -> Result<Self, TableauError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| TableauError::Network(format!("failed to create HTTP client: {}", e)))?;

        let pinned = OnceLock::new();
        if let Some(v) = api_version {
            let _ = pinned.set(v);
        }

        Ok(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            credentials,
            api_version: pinned,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the workbook page size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// The REST API version, asking the server once if not pinned.
    pub fn api_version(&self) -> Result<String, TableauError> {
        if let Some(v) = self.api_version.get() {
            return Ok(v.clone());
        }
        let url = format!("{}/api/{}/serverinfo", self.server_url, NEGOTIATION_VERSION);
        tracing::debug!(%url, "negotiating REST API version");
        let body = self.json(self.http.get(&url))?;
        let version = parse_rest_api_version(&body)?;
        tracing::info!(version = %version, "using Tableau REST API version");
        let _ = self.api_version.set(version);
        Ok(self.api_version.get().cloned().unwrap_or_default())
    }

    fn api_base(&self) -> Result<String, TableauError> {
        Ok(format!("{}/api/{}", self.server_url, self.api_version()?))
    }

    fn site_url(&self, session: &Session, path: &str) -> Result<String, TableauError> {
        Ok(format!("{}/sites/{}/{}", self.api_base()?, session.site_id, path))
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Send a request and map non-success statuses to errors.
    fn send(&self, req: RequestBuilder) -> Result<Response, TableauError> {
        let response = req.send().map_err(|e| TableauError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            let (code, msg) = extract_error(&body, status);
            let auth_code = code.as_deref().is_some_and(|c| c.starts_with("401"));
            if status == 401 || auth_code {
                return Err(TableauError::Authentication(msg));
            }
            return Err(TableauError::Http(status, msg));
        }

        Ok(response)
    }

    fn json(&self, req: RequestBuilder) -> Result<serde_json::Value, TableauError> {
        let response = self.send(req.header(ACCEPT, "application/json"))?;
        let text = response.text().map_err(|e| TableauError::Io(e.to_string()))?;
        serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
            TableauError::Parse(format!(
                "{} (body: {})",
                e,
                text.chars().take(200).collect::<String>()
            ))
        })
    }

    fn bytes(&self, req: RequestBuilder) -> Result<Vec<u8>, TableauError> {
        let response = self.send(req)?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| TableauError::Io(e.to_string()))
    }

    fn authed_get(&self, session: &Session, url: &str) -> RequestBuilder {
        tracing::debug!(%url, "GET");
        self.http.get(url).header(AUTH_HEADER, &session.token)
    }

    fn workbook_page(&self, session: &Session, page: u64) -> Result<serde_json::Value, TableauError> {
        let url = self.site_url(session, "workbooks")?;
        let req = self
            .authed_get(session, &url)
            .query(&[("pageSize", self.page_size), ("pageNumber", page)]);
        self.json(req)
    }
}

impl ServerApi for TableauClient {
    fn sign_in(&self) -> Result<Session, TableauError> {
        let url = format!("{}/auth/signin", self.api_base()?);
        tracing::debug!(%url, token_name = %self.credentials.token_name, site = %self.credentials.site, "signing in");
        let req = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&self.credentials.signin_body());
        // A refused sign-in is a credentials problem even when the server says 403
        let body = self.json(req).map_err(|e| match e {
            TableauError::Http(403, msg) => TableauError::Authentication(msg),
            other => other,
        })?;
        let session = parse_session(&body)?;
        tracing::info!(site = %self.credentials.site, "signed in to Tableau");
        Ok(session)
    }

    fn sign_out(&self, session: &Session) -> Result<(), TableauError> {
        let url = format!("{}/auth/signout", self.api_base()?);
        tracing::debug!(%url, "signing out");
        self.send(self.http.post(&url).header(AUTH_HEADER, &session.token))?;
        Ok(())
    }

    /// All workbooks on the site, following pagination until
    /// `totalAvailable` is reached.
    fn workbooks(&self, session: &Session) -> Result<Vec<WorkbookItem>, TableauError> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let body = self.workbook_page(session, page)?;
            let items = parse_workbooks(&body)?;
            let fetched = items.len();
            all.extend(items);

            let total = parse_pagination(&body).map(|p| p.total_available);
            tracing::debug!(page, fetched, total = ?total, "workbook page");
            match total {
                Some(total) if (all.len() as u64) < total && fetched > 0 => page += 1,
                _ => break,
            }
        }

        Ok(all)
    }

    fn views(&self, session: &Session, workbook_id: &str) -> Result<Vec<ViewItem>, TableauError> {
        let url = self.site_url(session, &format!("workbooks/{}/views", workbook_id))?;
        let body = self.json(self.authed_get(session, &url))?;
        parse_views(&body)
    }

    fn view_image(&self, session: &Session, view_id: &str) -> Result<Vec<u8>, TableauError> {
        let url = self.site_url(session, &format!("views/{}/image", view_id))?;
        self.bytes(self.authed_get(session, &url))
    }

    fn view_data(&self, session: &Session, view_id: &str) -> Result<Vec<u8>, TableauError> {
        let url = self.site_url(session, &format!("views/{}/data", view_id))?;
        self.bytes(self.authed_get(session, &url))
    }
}

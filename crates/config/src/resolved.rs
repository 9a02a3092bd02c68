// Resolved runtime configuration
//
// Single source of truth for what the components actually use. Built once
// at startup and passed by reference; nothing reads settings globally.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;
use crate::secrets::{keychain_available, Secret, SecretLookup, SecretResolver, SecretSource, SecretsFile};
use crate::settings::{AIProvider, OversizePolicy, PromptSettings, Settings};

pub const SERVER_URL_ENV: &str = "VIZDASH_TABLEAU_SERVER_URL";
pub const SITE_ID_ENV: &str = "VIZDASH_TABLEAU_SITE_ID";
pub const TOKEN_NAME_ENV: &str = "VIZDASH_TABLEAU_TOKEN_NAME";
pub const API_VERSION_ENV: &str = "VIZDASH_TABLEAU_API_VERSION";
pub const GEMINI_MODEL_ENV: &str = "VIZDASH_GEMINI_MODEL";
pub const GEMINI_ENDPOINT_ENV: &str = "VIZDASH_GEMINI_ENDPOINT";

/// Everything needed to open a Tableau session.
#[derive(Clone)]
pub struct TableauConfig {
    /// Base URL without trailing slash
    pub server_url: String,
    /// Site content URL ("" = default site)
    pub site_id: String,
    pub token_name: String,
    pub token_secret: String,
    /// Pinned REST API version; None = negotiate
    pub api_version: Option<String>,
}

impl fmt::Debug for TableauConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableauConfig")
            .field("server_url", &self.server_url)
            .field("site_id", &self.site_id)
            .field("token_name", &self.token_name)
            .field("token_secret", &"<redacted>")
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Status of the analysis configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIConfigStatus {
    /// provider = none
    Disabled,
    Ready,
    MissingKey,
}

impl AIConfigStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ready => "ready",
            Self::MissingKey => "missing_key",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Effective analysis configuration
#[derive(Clone)]
pub struct AIConfig {
    pub provider: AIProvider,
    pub model: String,
    /// API base URL without trailing slash
    pub endpoint: String,
    pub api_key: Option<String>,
    pub key_source: SecretSource,
    pub timeout: Duration,
    pub status: AIConfigStatus,
}

impl fmt::Debug for AIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AIConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("key_source", &self.key_source)
            .field("status", &self.status)
            .finish()
    }
}

impl AIConfig {
    /// The API key, or the error the `analyze` path reports.
    pub fn require_key(&self) -> Result<&str, ConfigError> {
        match self.status {
            AIConfigStatus::Disabled => Err(ConfigError::AiDisabled),
            _ => self.api_key.as_deref().ok_or(ConfigError::MissingKey {
                provider: self.provider.name(),
                env_var: Secret::GeminiKey.env_var(),
            }),
        }
    }
}

#[derive(Clone)]
struct TableauSources {
    server_url: SecretLookup,
    site_id: SecretLookup,
    token_name: SecretLookup,
    token_secret: SecretLookup,
    api_version: Option<String>,
}

#[derive(Clone)]
pub struct ResolvedConfig {
    tableau: TableauSources,
    pub ai: AIConfig,
    pub cache_ttl: Duration,
    pub prompt: PromptSettings,
    secrets_file_loaded: bool,
}

impl ResolvedConfig {
    /// Load settings.json and secrets from their default locations.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Settings::load();
        let secrets = SecretResolver::from_environment()?;
        Ok(Self::resolve(&settings, &secrets))
    }

    /// Merge settings with env/secrets-file/keychain values.
    pub fn resolve(settings: &Settings, secrets: &SecretResolver) -> Self {
        let file = secrets.secrets_file();
        let file_tableau = file.map(|f| &f.tableau);
        let file_gemini = file.map(|f| &f.gemini);

        let server_url = secrets.field(
            SERVER_URL_ENV,
            &settings.tableau.server_url,
            file_tableau.and_then(|t| t.server_url.as_deref()),
        );
        let site_id = secrets.field(
            SITE_ID_ENV,
            &settings.tableau.site_id,
            file_tableau.and_then(|t| t.site_id.as_deref()),
        );
        let token_name = secrets.field(
            TOKEN_NAME_ENV,
            &settings.tableau.token_name,
            file_tableau.and_then(|t| t.token_name.as_deref()),
        );
        let token_secret = secrets.secret(Secret::TableauTokenSecret);
        let api_version = secrets
            .var(API_VERSION_ENV)
            .or_else(|| settings.tableau.api_version.clone())
            .filter(|v| !v.trim().is_empty());

        let ai = resolve_ai(settings, secrets, file_gemini.and_then(|g| g.model_name.as_deref()));

        Self {
            tableau: TableauSources { server_url, site_id, token_name, token_secret, api_version },
            ai,
            cache_ttl: Duration::from_secs(settings.cache.ttl_secs),
            prompt: settings.prompt.clone(),
            secrets_file_loaded: file.is_some(),
        }
    }

    /// The Tableau connection settings, or the first missing/invalid field.
    pub fn tableau(&self) -> Result<TableauConfig, ConfigError> {
        let t = &self.tableau;
        let server_url = t.server_url.value.as_deref().ok_or(ConfigError::Missing {
            field: "tableau.server_url",
            env_var: SERVER_URL_ENV,
        })?;
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "tableau.server_url".to_string(),
                message: format!("expected an http(s) URL, got '{}'", server_url),
            });
        }
        let token_name = t.token_name.value.clone().ok_or(ConfigError::Missing {
            field: "tableau.token_name",
            env_var: TOKEN_NAME_ENV,
        })?;
        let token_secret = t.token_secret.value.clone().ok_or(ConfigError::Missing {
            field: "tableau.token_secret",
            env_var: Secret::TableauTokenSecret.env_var(),
        })?;

        Ok(TableauConfig {
            server_url: server_url.trim_end_matches('/').to_string(),
            site_id: t.site_id.value.clone().unwrap_or_default(),
            token_name,
            token_secret,
            api_version: t.api_version.clone(),
        })
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let t = &self.tableau;
        let missing = [
            ("tableau.server_url", &t.server_url),
            ("tableau.token_name", &t.token_name),
            ("tableau.token_secret", &t.token_secret),
        ]
        .iter()
        .filter(|(_, lookup)| lookup.value.is_none())
        .map(|(name, _)| name.to_string())
        .collect();

        Diagnostics {
            config_path: Settings::config_path_display(),
            secrets_path: SecretsFile::default_path().display().to_string(),
            secrets_file_loaded: self.secrets_file_loaded,
            server_url: t.server_url.value.clone(),
            server_url_source: t.server_url.source.as_str(),
            site_id: t.site_id.value.clone().unwrap_or_default(),
            token_name: t.token_name.value.clone(),
            token_secret_present: t.token_secret.value.is_some(),
            token_secret_source: t.token_secret.source.as_str(),
            api_version: t.api_version.clone(),
            missing,
            ai_provider: self.ai.provider.name(),
            ai_status: self.ai.status.as_str(),
            ai_model: self.ai.model.clone(),
            ai_endpoint: self.ai.endpoint.clone(),
            ai_key_present: self.ai.api_key.is_some(),
            ai_key_source: self.ai.key_source.as_str(),
            keychain_available: keychain_available(),
            cache_ttl_secs: self.cache_ttl.as_secs(),
            max_table_chars: self.prompt.max_table_chars,
            oversize: match self.prompt.oversize {
                OversizePolicy::Truncate => "truncate",
                OversizePolicy::Reject => "reject",
            },
        }
    }
}

fn resolve_ai(settings: &Settings, secrets: &SecretResolver, file_model: Option<&str>) -> AIConfig {
    let ai = &settings.ai;
    let provider = ai.provider;
    let timeout = Duration::from_secs(ai.timeout_secs);

    if !provider.is_enabled() {
        return AIConfig {
            provider,
            model: String::new(),
            endpoint: String::new(),
            api_key: None,
            key_source: SecretSource::None,
            timeout,
            status: AIConfigStatus::Disabled,
        };
    }

    let model = secrets
        .field(GEMINI_MODEL_ENV, &ai.model, file_model)
        .value
        .unwrap_or_else(|| provider.default_model().to_string());
    let endpoint = secrets
        .var(GEMINI_ENDPOINT_ENV)
        .unwrap_or_else(|| ai.effective_endpoint().to_string())
        .trim_end_matches('/')
        .to_string();

    let lookup = secrets.secret(Secret::GeminiKey);
    let status = if lookup.value.is_some() {
        AIConfigStatus::Ready
    } else {
        AIConfigStatus::MissingKey
    };

    AIConfig {
        provider,
        model,
        endpoint,
        api_key: lookup.value,
        key_source: lookup.source,
        timeout,
        status,
    }
}

// ── Diagnostics (for `vizdash doctor`) ─────────────────────────────

#[derive(Debug, Serialize)]
pub struct Diagnostics {
    pub config_path: String,
    pub secrets_path: String,
    pub secrets_file_loaded: bool,
    pub server_url: Option<String>,
    pub server_url_source: &'static str,
    pub site_id: String,
    pub token_name: Option<String>,
    pub token_secret_present: bool,
    pub token_secret_source: &'static str,
    pub api_version: Option<String>,
    /// Required Tableau fields with no value
    pub missing: Vec<String>,
    pub ai_provider: &'static str,
    pub ai_status: &'static str,
    pub ai_model: String,
    pub ai_endpoint: String,
    pub ai_key_present: bool,
    pub ai_key_source: &'static str,
    pub keychain_available: bool,
    pub cache_ttl_secs: u64,
    pub max_table_chars: usize,
    pub oversize: &'static str,
}

impl Diagnostics {
    pub fn tableau_ready(&self) -> bool {
        self.missing.is_empty()
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files")?;
        writeln!(f, "──────────────────────────────")?;
        writeln!(f, "Settings:          {}", self.config_path)?;
        writeln!(f, "Secrets:           {} ({})", self.secrets_path,
            if self.secrets_file_loaded { "loaded" } else { "not found" })?;
        writeln!(f)?;

        writeln!(f, "Tableau")?;
        writeln!(f, "──────────────────────────────")?;
        writeln!(f, "Server URL:        {} [{}]",
            self.server_url.as_deref().unwrap_or("-"), self.server_url_source)?;
        writeln!(f, "Site:              {}",
            if self.site_id.is_empty() { "(default)" } else { self.site_id.as_str() })?;
        writeln!(f, "Token name:        {}", self.token_name.as_deref().unwrap_or("-"))?;
        writeln!(f, "Token secret:      {} [{}]",
            yes_no(self.token_secret_present), self.token_secret_source)?;
        writeln!(f, "API version:       {}",
            self.api_version.as_deref().unwrap_or("negotiate"))?;
        if !self.missing.is_empty() {
            writeln!(f, "Missing:           {}", self.missing.join(", "))?;
        }
        writeln!(f)?;

        writeln!(f, "Analysis")?;
        writeln!(f, "──────────────────────────────")?;
        writeln!(f, "Provider:          {}", self.ai_provider)?;
        writeln!(f, "Status:            {}", self.ai_status)?;
        if self.ai_provider != "none" {
            writeln!(f, "Model:             {}", self.ai_model)?;
            writeln!(f, "Endpoint:          {}", self.ai_endpoint)?;
            writeln!(f, "Key present:       {}", yes_no(self.ai_key_present))?;
            writeln!(f, "Key source:        {}", self.ai_key_source)?;
        }
        writeln!(f, "Keychain available:{}", yes_no(self.keychain_available))?;
        writeln!(f, "Cache TTL:         {}s", self.cache_ttl_secs)?;
        writeln!(f, "Table budget:      {} chars ({})", self.max_table_chars, self.oversize)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn full_settings() -> Settings {
        let mut s = Settings::default();
        s.tableau.server_url = "https://tab.example.com/".into();
        s.tableau.site_id = "sales".into();
        s.tableau.token_name = "pat".into();
        s
    }

    #[test]
    fn test_resolve_complete() {
        let r = SecretResolver::with_env(
            None,
            env(&[("VIZDASH_TABLEAU_TOKEN_SECRET", "s3cret"), ("VIZDASH_GEMINI_KEY", "k")]),
        );
        let cfg = ResolvedConfig::resolve(&full_settings(), &r);
        let t = cfg.tableau().unwrap();
        assert_eq!(t.server_url, "https://tab.example.com");
        assert_eq!(t.site_id, "sales");
        assert_eq!(t.token_secret, "s3cret");
        assert!(cfg.ai.status.is_ready());
        assert_eq!(cfg.ai.require_key().unwrap(), "k");
        assert_eq!(cfg.cache_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_missing_secret_is_reported() {
        let r = SecretResolver::with_env(None, HashMap::new());
        let cfg = ResolvedConfig::resolve(&full_settings(), &r);
        match cfg.tableau() {
            Err(ConfigError::Missing { field, env_var }) => {
                assert_eq!(field, "tableau.token_secret");
                assert_eq!(env_var, "VIZDASH_TABLEAU_TOKEN_SECRET");
            }
            other => panic!("expected Missing, got {:?}", other),
        }
        assert_eq!(cfg.diagnostics().missing, vec!["tableau.token_secret".to_string()]);
    }

    #[test]
    fn test_missing_server_url_comes_first() {
        let r = SecretResolver::with_env(None, HashMap::new());
        let cfg = ResolvedConfig::resolve(&Settings::default(), &r);
        assert!(matches!(
            cfg.tableau(),
            Err(ConfigError::Missing { field: "tableau.server_url", .. })
        ));
        assert_eq!(cfg.diagnostics().missing.len(), 3);
    }

    #[test]
    fn test_invalid_server_url() {
        let mut s = full_settings();
        s.tableau.server_url = "tab.example.com".into();
        let r = SecretResolver::with_env(None, env(&[("VIZDASH_TABLEAU_TOKEN_SECRET", "x")]));
        let cfg = ResolvedConfig::resolve(&s, &r);
        assert!(matches!(cfg.tableau(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_secrets_file_fills_everything() {
        let file = SecretsFile::parse(
            r#"
[tableau]
server_url = "https://file.example.com"
site_id = "hr"
token_name = "file-pat"
token_secret = "file-secret"

[gemini]
api_key = "file-key"
model_name = "gemini-pro"
"#,
        )
        .unwrap();
        let r = SecretResolver::with_env(Some(file), HashMap::new());
        let cfg = ResolvedConfig::resolve(&Settings::default(), &r);
        let t = cfg.tableau().unwrap();
        assert_eq!(t.server_url, "https://file.example.com");
        assert_eq!(t.site_id, "hr");
        assert_eq!(cfg.ai.model, "gemini-pro");
        assert_eq!(cfg.ai.key_source, SecretSource::SecretsFile);
        assert!(cfg.diagnostics().secrets_file_loaded);
    }

    #[test]
    fn test_missing_gemini_key_only_blocks_analysis() {
        let r = SecretResolver::with_env(None, env(&[("VIZDASH_TABLEAU_TOKEN_SECRET", "x")]));
        let cfg = ResolvedConfig::resolve(&full_settings(), &r);
        assert!(cfg.tableau().is_ok());
        assert_eq!(cfg.ai.status, AIConfigStatus::MissingKey);
        assert!(matches!(cfg.ai.require_key(), Err(ConfigError::MissingKey { .. })));
    }

    #[test]
    fn test_disabled_provider() {
        let mut s = full_settings();
        s.ai.provider = AIProvider::None;
        let r = SecretResolver::with_env(None, env(&[("VIZDASH_GEMINI_KEY", "k")]));
        let cfg = ResolvedConfig::resolve(&s, &r);
        assert_eq!(cfg.ai.status, AIConfigStatus::Disabled);
        assert!(matches!(cfg.ai.require_key(), Err(ConfigError::AiDisabled)));
    }

    #[test]
    fn test_endpoint_env_override_and_api_version() {
        let r = SecretResolver::with_env(
            None,
            env(&[
                ("VIZDASH_GEMINI_ENDPOINT", "http://127.0.0.1:9000/"),
                ("VIZDASH_TABLEAU_API_VERSION", "3.19"),
                ("VIZDASH_TABLEAU_TOKEN_SECRET", "x"),
            ]),
        );
        let cfg = ResolvedConfig::resolve(&full_settings(), &r);
        assert_eq!(cfg.ai.endpoint, "http://127.0.0.1:9000");
        assert_eq!(cfg.tableau().unwrap().api_version.as_deref(), Some("3.19"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let r = SecretResolver::with_env(
            None,
            env(&[("VIZDASH_TABLEAU_TOKEN_SECRET", "hunter2"), ("VIZDASH_GEMINI_KEY", "hunter3")]),
        );
        let cfg = ResolvedConfig::resolve(&full_settings(), &r);
        let t = format!("{:?}", cfg.tableau().unwrap());
        let a = format!("{:?}", cfg.ai);
        assert!(!t.contains("hunter2"));
        assert!(!a.contains("hunter3"));
    }

    #[test]
    fn test_diagnostics_display() {
        let r = SecretResolver::with_env(None, HashMap::new());
        let cfg = ResolvedConfig::resolve(&full_settings(), &r);
        let text = cfg.diagnostics().to_string();
        assert!(text.contains("Server URL:        https://tab.example.com/ [settings]"));
        assert!(text.contains("Missing:           tableau.token_secret"));
        assert!(text.contains("Status:            missing_key"));
    }
}

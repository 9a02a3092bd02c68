//! Personal access token credentials.

use serde_json::json;

/// A Tableau personal access token plus the site it signs in to.
#[derive(Clone)]
pub struct PatCredentials {
    pub token_name: String,
    pub token_secret: String,
    /// Site content URL ("" = default site)
    pub site: String,
}

impl PatCredentials {
    pub fn new(token_name: impl Into<String>, token_secret: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            token_name: token_name.into(),
            token_secret: token_secret.into(),
            site: site.into(),
        }
    }

    /// Body for `POST /auth/signin`.
    pub(crate) fn signin_body(&self) -> serde_json::Value {
        json!({
            "credentials": {
                "personalAccessTokenName": self.token_name,
                "personalAccessTokenSecret": self.token_secret,
                "site": { "contentUrl": self.site },
            }
        })
    }
}

impl std::fmt::Debug for PatCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatCredentials")
            .field("token_name", &self.token_name)
            .field("token_secret", &"<redacted>")
            .field("site", &self.site)
            .finish()
    }
}

use thiserror::Error;

/// Error type for Tableau REST operations.
#[derive(Debug, Error)]
pub enum TableauError {
    /// Credentials rejected or session expired (401, Tableau 401xxx codes, 403 on sign-in)
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Transport failure (DNS, connect, TLS, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {0}: {1}")]
    Http(u16, String),

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Failed reading a response body
    #[error("I/O error: {0}")]
    Io(String),
}

impl TableauError {
    /// True for failures caused by the credentials rather than the server.
    pub fn is_authentication(&self) -> bool {
        matches!(self, TableauError::Authentication(_))
    }
}

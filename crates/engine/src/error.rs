use thiserror::Error;

use vizdash_io::TableError;
use vizdash_tableau_client::TableauError;

/// Failure of a catalog or export call.
///
/// Not-found is never an error: it is `None` or an empty list.
#[derive(Debug, Clone, Error)]
pub enum DashError {
    /// Bad or expired credentials. Not retried.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or server failure. The caller keeps its previous state.
    #[error("connection to Tableau failed: {0}")]
    Connectivity(String),
}

impl From<TableauError> for DashError {
    fn from(e: TableauError) -> Self {
        match e {
            TableauError::Authentication(msg) => DashError::Authentication(msg),
            other => DashError::Connectivity(other.to_string()),
        }
    }
}

impl From<TableError> for DashError {
    fn from(e: TableError) -> Self {
        DashError::Connectivity(format!("malformed view data: {}", e))
    }
}

/// Server answered 404 for an item the catalog listed.
pub(crate) fn is_not_found(e: &TableauError) -> bool {
    matches!(e, TableauError::Http(404, _))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tableau_error_mapping() {
        let e: DashError = TableauError::Authentication("expired".into()).into();
        assert!(matches!(e, DashError::Authentication(m) if m == "expired"));

        let e: DashError = TableauError::Network("timed out".into()).into();
        assert!(matches!(e, DashError::Connectivity(m) if m.contains("timed out")));

        let e: DashError = TableauError::Http(502, "bad gateway".into()).into();
        assert!(matches!(e, DashError::Connectivity(m) if m.contains("502")));
    }
}

// Configuration errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required Tableau setting has no value in any source
    #[error("missing {field} (set {env_var}, settings.json or secrets.toml)")]
    Missing { field: &'static str, env_var: &'static str },

    /// Analysis was requested but no API key is available
    #[error("no {provider} API key found (set {env_var}, secrets.toml or the keychain)")]
    MissingKey { provider: &'static str, env_var: &'static str },

    /// Analysis is turned off in settings
    #[error("analysis is disabled (ai.provider = \"none\")")]
    AiDisabled,

    #[error("invalid {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("keychain: {0}")]
    Keychain(String),
}

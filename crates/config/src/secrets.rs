// Secrets management
//
// The Tableau token secret and the Gemini API key are looked up in order:
// 1. Environment variables (VIZDASH_TABLEAU_TOKEN_SECRET, VIZDASH_GEMINI_KEY)
// 2. secrets.toml next to settings.json (or $VIZDASH_SECRETS)
// 3. System keychain
//
// Secrets are NEVER stored in settings.json

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::settings::Settings;

/// Service name for keychain storage
#[cfg_attr(not(feature = "keychain"), allow(dead_code))]
const KEYCHAIN_SERVICE: &str = "vizdash";

/// Env var naming an alternate secrets.toml
pub const SECRETS_PATH_ENV: &str = "VIZDASH_SECRETS";

/// A secret the application needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    /// Tableau personal access token secret
    TableauTokenSecret,
    /// Gemini API key
    GeminiKey,
}

impl Secret {
    pub fn env_var(&self) -> &'static str {
        match self {
            Secret::TableauTokenSecret => "VIZDASH_TABLEAU_TOKEN_SECRET",
            Secret::GeminiKey => "VIZDASH_GEMINI_KEY",
        }
    }

    /// Keychain account name
    pub fn keychain_account(&self) -> &'static str {
        match self {
            Secret::TableauTokenSecret => "tableau/token_secret",
            Secret::GeminiKey => "ai/gemini",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Secret::TableauTokenSecret => "Tableau token secret",
            Secret::GeminiKey => "Gemini API key",
        }
    }
}

/// Where a value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Environment,
    /// settings.json
    Settings,
    /// secrets.toml
    SecretsFile,
    Keychain,
    None,
}

impl SecretSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretSource::Environment => "environment",
            SecretSource::Settings => "settings",
            SecretSource::SecretsFile => "secrets_file",
            SecretSource::Keychain => "keychain",
            SecretSource::None => "none",
        }
    }
}

/// Result of a lookup
#[derive(Clone)]
pub struct SecretLookup {
    pub value: Option<String>,
    pub source: SecretSource,
}

impl std::fmt::Debug for SecretLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretLookup")
            .field("present", &self.value.is_some())
            .field("source", &self.source)
            .finish()
    }
}

impl SecretLookup {
    fn missing() -> Self {
        Self { value: None, source: SecretSource::None }
    }
}

// ── secrets.toml ────────────────────────────────────────────────────

/// Streamlit-style secrets file:
///
/// ```toml
/// [tableau]
/// server_url = "https://tableau.example.com"
/// site_id = "marketing"
/// token_name = "dashboard"
/// token_secret = "..."
///
/// [gemini]
/// api_key = "..."
/// model_name = "gemini-1.5-flash"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretsFile {
    #[serde(default)]
    pub tableau: TableauSecrets,
    #[serde(default)]
    pub gemini: GeminiSecrets,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableauSecrets {
    pub server_url: Option<String>,
    pub site_id: Option<String>,
    pub token_name: Option<String>,
    pub token_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiSecrets {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
}

impl SecretsFile {
    /// Default location: ~/.config/vizdash/secrets.toml, overridable via $VIZDASH_SECRETS
    pub fn default_path() -> PathBuf {
        match env::var(SECRETS_PATH_ENV) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => Settings::config_dir().join("secrets.toml"),
        }
    }

    /// Load from `path`. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&contents).map(Some).map_err(|e| ConfigError::Invalid {
            field: path.display().to_string(),
            message: e,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    fn secret(&self, secret: Secret) -> Option<&str> {
        match secret {
            Secret::TableauTokenSecret => self.tableau.token_secret.as_deref(),
            Secret::GeminiKey => self.gemini.api_key.as_deref(),
        }
    }
}

// ── Resolver ────────────────────────────────────────────────────────

enum EnvSource {
    Process,
    Fixed(HashMap<String, String>),
}

/// Set to any non-empty value to skip keychain lookups (CI, containers).
pub const NO_KEYCHAIN_ENV: &str = "VIZDASH_NO_KEYCHAIN";

/// Resolves settings fields and secrets across env, files and keychain.
pub struct SecretResolver {
    file: Option<SecretsFile>,
    env: EnvSource,
    keychain: bool,
}

impl SecretResolver {
    /// Resolver over the process environment, the default secrets file and the keychain.
    pub fn from_environment() -> Result<Self, ConfigError> {
        let path = SecretsFile::default_path();
        let file = SecretsFile::load_from(&path)?;
        if file.is_some() {
            tracing::debug!(path = %path.display(), "loaded secrets file");
        }
        let keychain = env::var(NO_KEYCHAIN_ENV).map(|v| v.trim().is_empty()).unwrap_or(true);
        Ok(Self { file, env: EnvSource::Process, keychain })
    }

    /// Resolver with a fixed environment and no keychain access.
    pub fn with_env(file: Option<SecretsFile>, env: HashMap<String, String>) -> Self {
        Self { file, env: EnvSource::Fixed(env), keychain: false }
    }

    pub fn secrets_file(&self) -> Option<&SecretsFile> {
        self.file.as_ref()
    }

    /// Non-empty environment value
    pub fn var(&self, name: &str) -> Option<String> {
        let value = match &self.env {
            EnvSource::Process => env::var(name).ok(),
            EnvSource::Fixed(map) => map.get(name).cloned(),
        };
        value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    /// Look up a secret: environment, then secrets file, then keychain.
    pub fn secret(&self, secret: Secret) -> SecretLookup {
        if let Some(value) = self.var(secret.env_var()) {
            return SecretLookup { value: Some(value), source: SecretSource::Environment };
        }

        if let Some(value) = self
            .file
            .as_ref()
            .and_then(|f| f.secret(secret))
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return SecretLookup {
                value: Some(value.to_string()),
                source: SecretSource::SecretsFile,
            };
        }

        if self.keychain {
            if let Some(value) = keychain_get(secret) {
                return SecretLookup { value: Some(value), source: SecretSource::Keychain };
            }
        }

        SecretLookup::missing()
    }

    /// Resolve a plain field: environment, then settings.json, then secrets file.
    pub fn field(
        &self,
        env_name: &str,
        settings_value: &str,
        file_value: Option<&str>,
    ) -> SecretLookup {
        if let Some(value) = self.var(env_name) {
            return SecretLookup { value: Some(value), source: SecretSource::Environment };
        }
        let settings_value = settings_value.trim();
        if !settings_value.is_empty() {
            return SecretLookup {
                value: Some(settings_value.to_string()),
                source: SecretSource::Settings,
            };
        }
        if let Some(value) = file_value.map(str::trim).filter(|v| !v.is_empty()) {
            return SecretLookup {
                value: Some(value.to_string()),
                source: SecretSource::SecretsFile,
            };
        }
        SecretLookup::missing()
    }
}

// ── Keychain ────────────────────────────────────────────────────────

#[cfg(feature = "keychain")]
fn keychain_get(secret: Secret) -> Option<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, secret.keychain_account()).ok()?;
    entry.get_password().ok().filter(|v| !v.is_empty())
}

#[cfg(not(feature = "keychain"))]
fn keychain_get(_secret: Secret) -> Option<String> {
    None
}

/// Store a secret in the system keychain
#[cfg(feature = "keychain")]
pub fn set_secret(secret: Secret, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, secret.keychain_account())
        .map_err(|e| ConfigError::Keychain(format!("failed to create keychain entry: {}", e)))?;

    entry
        .set_password(value)
        .map_err(|e| ConfigError::Keychain(format!("failed to store {}: {}", secret.label(), e)))
}

#[cfg(not(feature = "keychain"))]
pub fn set_secret(secret: Secret, _value: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Keychain(format!(
        "keychain support not enabled; set {} instead",
        secret.env_var()
    )))
}

/// Delete a secret from the system keychain
#[cfg(feature = "keychain")]
pub fn delete_secret(secret: Secret) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, secret.keychain_account())
        .map_err(|e| ConfigError::Keychain(format!("failed to access keychain entry: {}", e)))?;

    entry
        .delete_credential()
        .map_err(|e| ConfigError::Keychain(format!("failed to delete {}: {}", secret.label(), e)))
}

#[cfg(not(feature = "keychain"))]
pub fn delete_secret(_secret: Secret) -> Result<(), ConfigError> {
    Err(ConfigError::Keychain("keychain support not enabled".to_string()))
}

/// Check if keychain support is available
pub fn keychain_available() -> bool {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(KEYCHAIN_SERVICE, "probe").is_ok()
    }
    #[cfg(not(feature = "keychain"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    const SECRETS: &str = r#"
[tableau]
server_url = "https://file.example.com"
site_id = "sales"
token_name = "file-pat"
token_secret = "file-secret"

[gemini]
api_key = "file-key"
model_name = "gemini-pro"
"#;

    #[test]
    fn test_env_var_names() {
        assert_eq!(Secret::TableauTokenSecret.env_var(), "VIZDASH_TABLEAU_TOKEN_SECRET");
        assert_eq!(Secret::GeminiKey.env_var(), "VIZDASH_GEMINI_KEY");
        assert_eq!(Secret::GeminiKey.keychain_account(), "ai/gemini");
    }

    #[test]
    fn test_parse_streamlit_layout() {
        let file = SecretsFile::parse(SECRETS).unwrap();
        assert_eq!(file.tableau.site_id.as_deref(), Some("sales"));
        assert_eq!(file.gemini.model_name.as_deref(), Some("gemini-pro"));
    }

    #[test]
    fn test_parse_missing_sections() {
        let file = SecretsFile::parse("[gemini]\napi_key = \"k\"\n").unwrap();
        assert!(file.tableau.token_secret.is_none());
        assert_eq!(file.gemini.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_env_wins_over_file() {
        let file = SecretsFile::parse(SECRETS).unwrap();
        let r = SecretResolver::with_env(Some(file), env(&[("VIZDASH_GEMINI_KEY", "env-key")]));
        let lookup = r.secret(Secret::GeminiKey);
        assert_eq!(lookup.value.as_deref(), Some("env-key"));
        assert_eq!(lookup.source, SecretSource::Environment);

        let lookup = r.secret(Secret::TableauTokenSecret);
        assert_eq!(lookup.value.as_deref(), Some("file-secret"));
        assert_eq!(lookup.source, SecretSource::SecretsFile);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let r = SecretResolver::with_env(None, env(&[("VIZDASH_GEMINI_KEY", "   ")]));
        let lookup = r.secret(Secret::GeminiKey);
        assert!(lookup.value.is_none());
        assert_eq!(lookup.source, SecretSource::None);
    }

    #[test]
    fn test_field_precedence() {
        let r = SecretResolver::with_env(None, env(&[("X_URL", "from-env")]));
        assert_eq!(r.field("X_URL", "from-settings", Some("from-file")).source, SecretSource::Environment);

        let r = SecretResolver::with_env(None, HashMap::new());
        let l = r.field("X_URL", "from-settings", Some("from-file"));
        assert_eq!(l.value.as_deref(), Some("from-settings"));
        let l = r.field("X_URL", "", Some("from-file"));
        assert_eq!(l.source, SecretSource::SecretsFile);
        let l = r.field("X_URL", "", None);
        assert!(l.value.is_none());
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = SecretsFile::load_from(&dir.path().join("secrets.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "[tableau\nbroken").unwrap();
        let err = SecretsFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}

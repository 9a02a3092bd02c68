// Application settings
// Loaded from ~/.config/vizdash/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default freshness window for cached catalog/export results, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Default ceiling on serialized table size embedded in a prompt.
pub const DEFAULT_MAX_TABLE_CHARS: usize = 200_000;

/// AI provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    /// Analysis disabled
    None,
    /// Google Gemini generateContent API
    #[default]
    Gemini,
}

impl AIProvider {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AIProvider::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AIProvider::None => "none",
            AIProvider::Gemini => "gemini",
        }
    }

    /// Model used when settings and secrets name none
    pub fn default_model(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::Gemini => "gemini-1.5-flash",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::Gemini => "https://generativelanguage.googleapis.com",
        }
    }
}

/// What to do when a table does not fit in the prompt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizePolicy {
    /// Keep the header and as many whole rows as fit
    #[default]
    Truncate,
    /// Refuse to build the prompt
    Reject,
}

/// Tableau Server connection settings (the token secret lives elsewhere)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableauSettings {
    /// Server base URL, e.g. "https://tableau.example.com"
    pub server_url: String,

    /// Site content URL ("" = default site)
    pub site_id: String,

    /// Personal access token name
    pub token_name: String,

    /// Pinned REST API version; None = ask the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Analysis provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AISettings {
    pub provider: AIProvider,

    /// Model name; empty selects the provider default
    pub model: String,

    /// Base URL override (tests, proxies)
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AISettings {
    fn default() -> Self {
        Self {
            provider: AIProvider::Gemini,
            model: String::new(),
            endpoint: None,
            timeout_secs: 120,
        }
    }
}

impl AISettings {
    /// Configured base URL, else the provider's public one
    pub fn effective_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Freshness window in seconds
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: DEFAULT_CACHE_TTL_SECS }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Upper bound on the serialized table embedded in a prompt
    pub max_table_chars: usize,

    /// Behavior when the table exceeds `max_table_chars`
    pub oversize: OversizePolicy,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            max_table_chars: DEFAULT_MAX_TABLE_CHARS,
            oversize: OversizePolicy::Truncate,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tableau: TableauSettings,
    pub ai: AISettings,
    pub cache: CacheSettings,
    pub prompt: PromptSettings,
}

impl Settings {
    /// Directory holding settings.json and secrets.toml
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vizdash")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Read settings.json, writing a commented default on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from an explicit path. Unreadable or malformed files
    /// yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "error parsing settings: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), "error reading settings: {}", e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring lines that start with `//`.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!("error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Tableau Server connection
    // The token secret is NOT stored here: use VIZDASH_TABLEAU_TOKEN_SECRET,
    // secrets.toml next to this file, or the system keychain
    "tableau": {
        "server_url": "",
        "site_id": "",
        "token_name": ""
    },

    // Analysis provider: "gemini" or "none"
    // The API key is NOT stored here: use VIZDASH_GEMINI_KEY
    "ai": {
        "provider": "gemini",
        "model": "",
        "timeout_secs": 120
    },

    // Cached workbook/view/export results expire after this many seconds
    "cache": {
        "ttl_secs": 600
    },

    // Tables larger than this are truncated ("truncate") or refused ("reject")
    "prompt": {
        "max_table_chars": 200000,
        "oversize": "truncate"
    }
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            tracing::warn!("error writing default settings.json: {}", e);
        }
    }

    pub fn config_path_display() -> String {
        Self::config_path().display().to_string()
    }
}

// Configuration loading
//
// settings.json holds non-secret settings; secrets come from the
// environment, secrets.toml or the keychain. `ResolvedConfig` merges both
// into the validated values the rest of the workspace consumes.

pub mod error;
pub mod resolved;
pub mod secrets;
pub mod settings;

pub use error::ConfigError;
pub use resolved::{AIConfig, AIConfigStatus, Diagnostics, ResolvedConfig, TableauConfig};
pub use secrets::{Secret, SecretResolver, SecretSource};
pub use settings::{AIProvider, OversizePolicy, PromptSettings, Settings};

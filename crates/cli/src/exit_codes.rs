//! CLI Exit Code Registry
//!
//! Single source of truth for `vizdash` exit codes. Scripts rely on them.
//!
//! | Range   | Domain        | Description                              |
//! |---------|---------------|------------------------------------------|
//! | 0       | Universal     | Success                                  |
//! | 1       | Universal     | General error (unspecified)              |
//! | 2       | Universal     | CLI usage error (bad args)               |
//! | 10-19   | config        | Missing configuration, keys, keychain    |
//! | 20-29   | tableau       | Tableau Server access                    |
//! | 30-39   | analysis      | Prompt dispatch                          |

use vizdash_ai::{AnalysisError, DispatchError, PromptError};
use vizdash_config::ConfigError;
use vizdash_engine::DashError;

// =============================================================================
// Universal (0-2)
// =============================================================================

pub const EXIT_SUCCESS: u8 = 0;

/// General error. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error (bad arguments). clap exits with this too.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Config (10-19)
// =============================================================================

/// A required Tableau setting is missing or invalid.
pub const EXIT_CONFIG_MISSING: u8 = 10;

/// Analysis requested but no Gemini key (or provider = none).
pub const EXIT_AI_MISSING_KEY: u8 = 11;

/// Keychain read/write failed.
pub const EXIT_KEYCHAIN: u8 = 12;

// =============================================================================
// Tableau (20-29)
// =============================================================================

/// Credentials rejected.
pub const EXIT_TABLEAU_AUTH: u8 = 20;

/// Server unreachable or returned an unexpected response.
pub const EXIT_TABLEAU_CONNECT: u8 = 21;

// =============================================================================
// Analysis (30-39)
// =============================================================================

/// The model request failed.
pub const EXIT_ANALYSIS: u8 = 30;

/// The table exceeds the prompt budget and oversize = reject.
pub const EXIT_PROMPT_TOO_LARGE: u8 = 31;

pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::MissingKey { .. } | ConfigError::AiDisabled => EXIT_AI_MISSING_KEY,
        ConfigError::Keychain(_) => EXIT_KEYCHAIN,
        ConfigError::Missing { .. } | ConfigError::Invalid { .. } | ConfigError::Io { .. } => {
            EXIT_CONFIG_MISSING
        }
    }
}

pub fn dash_exit_code(err: &DashError) -> u8 {
    match err {
        DashError::Authentication(_) => EXIT_TABLEAU_AUTH,
        DashError::Connectivity(_) => EXIT_TABLEAU_CONNECT,
    }
}

pub fn dispatch_exit_code(err: &DispatchError) -> u8 {
    match err {
        DispatchError::Prompt(PromptError::TableTooLarge { .. }) => EXIT_PROMPT_TOO_LARGE,
        DispatchError::Analysis(AnalysisError::NotConfigured(_)) => EXIT_AI_MISSING_KEY,
        DispatchError::Analysis(_) => EXIT_ANALYSIS,
    }
}

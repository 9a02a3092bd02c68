//! `vizdash doctor`, `vizdash secret`

use std::io::{self, BufRead, IsTerminal};

use clap::{Subcommand, ValueEnum};
use serde::Serialize;

use vizdash_config::secrets::{delete_secret, set_secret};
use vizdash_config::{Diagnostics, ResolvedConfig, Secret};
use vizdash_engine::DashError;
use vizdash_tableau_client::{with_session, TableauClient};

use crate::context::load_config;
use crate::exit_codes::EXIT_CONFIG_MISSING;
use crate::{print_json, CliError};

#[derive(Serialize)]
struct DoctorJson<'a> {
    #[serde(flatten)]
    diagnostics: &'a Diagnostics,
    tableau_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<String>,
}

pub fn cmd_doctor(json: bool, check: bool) -> Result<(), CliError> {
    let config = load_config()?;
    let diag = config.diagnostics();

    let check_result = (check && diag.tableau_ready()).then(|| check_sign_in(&config));
    let check_text = check_result.as_ref().map(|r| match r {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("failed: {}", e),
    });

    if json {
        print_json(&DoctorJson {
            diagnostics: &diag,
            tableau_ready: diag.tableau_ready(),
            check: check_text,
        })?;
    } else {
        print!("{}", diag);
        if let Some(text) = &check_text {
            println!("Sign-in check:     {}", text);
        } else if check {
            println!("Sign-in check:     skipped (Tableau settings incomplete)");
        }
    }

    if !diag.tableau_ready() {
        return Err(CliError {
            code: EXIT_CONFIG_MISSING,
            message: format!("missing {}", diag.missing.join(", ")),
            hint: Some("set them in settings.json, secrets.toml or VIZDASH_TABLEAU_* variables".to_string()),
            notice: false,
        });
    }
    if let Some(Err(e)) = check_result {
        return Err(CliError::dash(e));
    }
    Ok(())
}

/// One sign-in/sign-out round trip.
fn check_sign_in(config: &ResolvedConfig) -> Result<(), DashError> {
    let tableau = config.tableau().map_err(|e| DashError::Connectivity(e.to_string()))?;
    let client = TableauClient::from_config(&tableau)?;
    with_session(&client, |_| Ok::<(), DashError>(()))
}

// ── Secrets ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, ValueEnum)]
pub enum SecretName {
    /// Tableau personal access token secret
    Tableau,
    /// Gemini API key
    Gemini,
}

impl SecretName {
    fn secret(self) -> Secret {
        match self {
            SecretName::Tableau => Secret::TableauTokenSecret,
            SecretName::Gemini => Secret::GeminiKey,
        }
    }
}

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Store a secret read from stdin
    #[command(after_help = "\
Examples:
  vizdash secret set gemini
  echo \"$TOKEN\" | vizdash secret set tableau")]
    Set {
        name: SecretName,
    },

    /// Remove a stored secret
    Delete {
        name: SecretName,
    },
}

pub fn cmd_secret(cmd: SecretCommands) -> Result<(), CliError> {
    match cmd {
        SecretCommands::Set { name } => {
            let secret = name.secret();
            let stdin = io::stdin();
            if stdin.is_terminal() {
                eprintln!("Enter {} (input is not hidden):", secret.label());
            }
            let mut line = String::new();
            stdin
                .lock()
                .read_line(&mut line)
                .map_err(|e| CliError::error(format!("failed to read stdin: {}", e)))?;
            let value = line.trim();
            if value.is_empty() {
                return Err(CliError::error("empty value; nothing stored"));
            }
            set_secret(secret, value).map_err(CliError::config)?;
            println!("Stored {} in the keychain", secret.label());
            Ok(())
        }
        SecretCommands::Delete { name } => {
            let secret = name.secret();
            delete_secret(secret).map_err(CliError::config)?;
            println!("Removed {} from the keychain", secret.label());
            Ok(())
        }
    }
}

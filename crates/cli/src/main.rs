// vizdash CLI - Tableau views with Gemini analysis
//
// Every data command resolves configuration, opens a cached Dashboard over
// the Tableau REST client and prints text or --json.

mod analyze;
mod catalog;
mod context;
mod doctor;
mod exit_codes;
mod logging;
mod tui;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use vizdash_ai::{AnalysisError, DispatchError, PromptError};
use vizdash_config::ConfigError;
use vizdash_engine::DashError;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "vizdash")]
#[command(about = "Browse Tableau workbooks, export views and analyze them with Gemini")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). VIZDASH_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List workbooks on the configured site
    #[command(after_help = "\
Workbooks with the same name are labeled 'Project/Name'.

Examples:
  vizdash workbooks
  vizdash workbooks --json | jq '.[].label'")]
    Workbooks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the views of a workbook
    #[command(after_help = "\
Examples:
  vizdash views Sales
  vizdash views 'Finance/Sales' --json")]
    Views {
        /// Workbook label (see `vizdash workbooks`)
        workbook: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a view's image and data
    #[command(after_help = "\
Without a view, the workbook's first view is exported.

Examples:
  vizdash export Sales Q1
  vizdash export Sales Q1 --image q1.png --csv q1.csv
  vizdash export Sales --max-rows 0
  vizdash export Sales Q1 --json")]
    Export {
        /// Workbook label
        workbook: String,

        /// View label (default: first view)
        view: Option<String>,

        /// Write the view image to this file
        #[arg(long, value_name = "PATH")]
        image: Option<std::path::PathBuf>,

        /// Write the view data as CSV to this file
        #[arg(long, value_name = "PATH")]
        csv: Option<std::path::PathBuf>,

        /// Rows to print (0 = all)
        #[arg(long, default_value_t = 50)]
        max_rows: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze a view with Gemini
    #[command(after_help = "\
Prompts:
  ppt    chart for a slide, as JSON
  graph  ideal graph design, as JSON
  rca    root cause analysis
  trend  trend insights and recommendations

Examples:
  vizdash analyze Sales Q1 --prompt trend
  vizdash analyze Sales Q1 --prompt rca --instructions 'ignore returns'
  vizdash analyze Sales Q1 --prompt ppt --json
  vizdash analyze Sales Q1 --prompt graph --dry-run")]
    Analyze {
        /// Workbook label
        workbook: String,

        /// View label
        view: String,

        /// Prompt template: ppt, graph, rca or trend
        #[arg(long, short = 'p')]
        prompt: vizdash_ai::PromptTemplate,

        /// Extra context for the model
        #[arg(long, short = 'i', default_value = "")]
        instructions: String,

        /// Print the prompt instead of sending it
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List prompt templates
    Templates {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration and where each value came from
    #[command(after_help = "\
Exit code 10 means a required Tableau setting is missing.

Examples:
  vizdash doctor
  vizdash doctor --check
  vizdash doctor --json")]
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Sign in and out once to verify the credentials
        #[arg(long)]
        check: bool,
    },

    /// Store or remove secrets in the system keychain
    #[command(subcommand)]
    Secret(doctor::SecretCommands),

    /// Interactive terminal dashboard
    #[command(after_help = "\
Keys:
  arrows / jk   move          Enter   select
  Esc / Bksp    back          p       next prompt
  i             instructions  a       analyze
  r             refresh       ?       help
  q             quit

Logs go to ~/.cache/vizdash/dashboard.log.")]
    Dashboard,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_target = match cli.command {
        Some(Commands::Dashboard) => logging::LogTarget::File(logging::dashboard_log_path()),
        _ => logging::LogTarget::Stderr,
    };
    logging::init(cli.verbose, log_target);

    let result = match cli.command {
        None => {
            eprintln!("Usage: vizdash <command> [options]");
            eprintln!("       vizdash --help for more information");
            Err(CliError { code: EXIT_USAGE, message: String::new(), hint: None, notice: false })
        }
        Some(Commands::Workbooks { json }) => catalog::cmd_workbooks(json),
        Some(Commands::Views { workbook, json }) => catalog::cmd_views(&workbook, json),
        Some(Commands::Export { workbook, view, image, csv, max_rows, json }) => {
            catalog::cmd_export(catalog::ExportArgs {
                workbook,
                view,
                image,
                csv,
                max_rows,
                json,
            })
        }
        Some(Commands::Analyze { workbook, view, prompt, instructions, dry_run, json }) => {
            analyze::cmd_analyze(analyze::AnalyzeArgs {
                workbook,
                view,
                template: prompt,
                instructions,
                dry_run,
                json,
            })
        }
        Some(Commands::Templates { json }) => analyze::cmd_templates(json),
        Some(Commands::Doctor { json, check }) => doctor::cmd_doctor(json, check),
        Some(Commands::Secret(cmd)) => doctor::cmd_secret(cmd),
        Some(Commands::Dashboard) => tui::cmd_dashboard(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint, notice }) => {
            if notice {
                eprintln!("{}", message);
            } else if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
    /// Printed without the "error:" prefix; the exit code still reports it.
    pub notice: bool,
}

impl CliError {
    pub fn error(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None, notice: false }
    }

    /// An expected outcome such as a missing view, not a failure.
    pub fn notice(msg: impl Into<String>) -> Self {
        Self { notice: true, ..Self::error(msg) }
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Missing { .. } | ConfigError::Invalid { .. } => {
                Some("run `vizdash doctor` to see where each setting is read from".to_string())
            }
            ConfigError::MissingKey { env_var, .. } => {
                Some(format!("export {}=... or run `vizdash secret set gemini`", env_var))
            }
            ConfigError::AiDisabled => {
                Some("set ai.provider to \"gemini\" in settings.json".to_string())
            }
            ConfigError::Io { .. } | ConfigError::Keychain(_) => None,
        };
        Self { code: exit_codes::config_exit_code(&err), message: err.to_string(), hint, notice: false }
    }

    pub fn dash(err: DashError) -> Self {
        let hint = match &err {
            DashError::Authentication(_) => {
                "check the personal access token name, secret and site id"
            }
            DashError::Connectivity(_) => "check tableau.server_url and network access",
        };
        Self {
            code: exit_codes::dash_exit_code(&err),
            message: err.to_string(),
            hint: Some(hint.to_string()),
            notice: false,
        }
    }

    pub fn dispatch(err: DispatchError) -> Self {
        let hint = match &err {
            DispatchError::Prompt(PromptError::TableTooLarge { .. }) => Some(
                "raise prompt.max_table_chars or set prompt.oversize to \"truncate\"".to_string(),
            ),
            DispatchError::Analysis(AnalysisError::Auth(_)) => {
                Some("check the Gemini API key (`vizdash doctor`)".to_string())
            }
            DispatchError::Analysis(AnalysisError::Quota(_)) => {
                Some("the request was not retried; try again later".to_string())
            }
            _ => None,
        };
        Self { code: exit_codes::dispatch_exit_code(&err), message: err.to_string(), hint, notice: false }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Pretty JSON to stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::error(format!("failed to serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

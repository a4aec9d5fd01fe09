// dyetrack CLI - dyehouse dispatch import and reconciliation

mod exit_codes;
mod import;
mod orders;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::OnceLock;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dyetrack_io::IoError;
use dyetrack_recon::{ReconError, StoreError};

use exit_codes::{io_exit_code, recon_exit_code, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "dyetrack")]
#[command(about = "Reconcile dyehouse dispatch sheets against open orders")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Import config (TOML). Defaults to the user config file, then built-in defaults.
    #[arg(long, global = true, env = "DYETRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging to stderr (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a dispatch sheet and print its records
    #[command(after_help = "\
Examples:
  dyetrack parse january.xlsx
  dyetrack parse january.xlsx --json | jq '.[0]'")]
    Parse {
        /// Dispatch sheet (xlsx, xls, xlsb, ods). Only the first sheet is read.
        sheet: PathBuf,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Match a dispatch sheet against stored orders without writing anything
    #[command(after_help = "\
ROW is the spreadsheet row number shown in the first column of the review.
An empty or unknown LABEL marks the row as new.

Examples:
  dyetrack reconcile january.xlsx --db orders.db
  dyetrack reconcile january.xlsx --db orders.db --pick '4=ORD-7 - Rib 2x2 (300kg)'
  dyetrack reconcile january.xlsx --db orders.db --export review.xlsx")]
    Reconcile {
        sheet: PathBuf,

        /// Order store (SQLite)
        #[arg(long, env = "DYETRACK_DB")]
        db: PathBuf,

        /// Manual override: ROW=LABEL. Repeatable.
        #[arg(long, value_name = "ROW=LABEL")]
        pick: Vec<String>,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,

        /// Write the review table to an xlsx file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Reconcile, then append every matched row to its order
    #[command(after_help = "\
Exit code 6 means a write failed. Rows before it are stored; the failing row
and every row after it are not.

Examples:
  dyetrack commit january.xlsx --db orders.db --dyehouse North
  dyetrack commit january.xlsx --db orders.db --pick '4=' --json")]
    Commit {
        sheet: PathBuf,

        /// Order store (SQLite)
        #[arg(long, env = "DYETRACK_DB")]
        db: PathBuf,

        /// Dyehouse stamped on written batches (overrides the config)
        #[arg(long)]
        dyehouse: Option<String>,

        /// Manual override: ROW=LABEL. Repeatable.
        #[arg(long, value_name = "ROW=LABEL")]
        pick: Vec<String>,

        /// Output the commit report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage stored orders and clients
    Orders {
        #[command(subcommand)]
        command: orders::OrdersCommands,
    },

    /// Inspect color batches and record deliveries or returns
    Batch {
        #[command(subcommand)]
        command: orders::BatchCommands,
    },

    /// Show or validate the import config
    Config {
        #[command(subcommand)]
        command: settings::ConfigCommands,
    },
}

fn long_version() -> &'static str {
    static LONG_VERSION: OnceLock<String> = OnceLock::new();
    LONG_VERSION.get_or_init(|| {
        format!(
            "{} ({})\ntarget:  {}\nstore schema: {}",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_COMMIT_HASH"),
            env!("TARGET"),
            dyetrack_io::STORE_SCHEMA_VERSION,
        )
    })
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Parse { sheet, json } => import::cmd_parse(config, sheet, json),
        Commands::Reconcile { sheet, db, pick, json, export } => {
            import::cmd_reconcile(config, sheet, db, pick, json, export)
        }
        Commands::Commit { sheet, db, dyehouse, pick, json } => {
            import::cmd_commit(config, sheet, db, dyehouse, pick, json)
        }
        Commands::Orders { command } => orders::cmd_orders(command),
        Commands::Batch { command } => orders::cmd_batch(command),
        Commands::Config { command } => settings::cmd_config(config, command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::SchemaVersion { .. } => Some("this store was written by a newer dyetrack".to_string()),
            IoError::OrderNotFound(_) => Some("list known orders with: dyetrack orders list --db <file>".to_string()),
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        Self::new(recon_exit_code(&err), err.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::new(EXIT_STORE, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn picks_are_repeatable() {
        let cli = Cli::parse_from([
            "dyetrack", "reconcile", "s.xlsx", "--db", "o.db", "--pick", "2=A", "--pick", "3=",
        ]);
        match cli.command {
            Commands::Reconcile { pick, .. } => assert_eq!(pick, vec!["2=A", "3="]),
            _ => panic!("expected reconcile"),
        }
    }

    #[test]
    fn store_errors_map_to_store_exit() {
        let err: CliError = IoError::BatchNotFound(9).into();
        assert_eq!(err.code, EXIT_STORE);
        let err: CliError = ReconError::LayoutValidation("dup".into()).into();
        assert_eq!(err.code, exit_codes::EXIT_INVALID_CONFIG);
        let err: CliError = IoError::CorruptEvent { batch_id: 1, message: "bad".into() }.into();
        assert_eq!(err.code, EXIT_STORE);
    }

    #[test]
    fn long_version_reports_store_schema() {
        let expected = format!("store schema: {}", dyetrack_io::STORE_SCHEMA_VERSION);
        assert!(long_version().ends_with(&expected), "{}", long_version());
    }
}

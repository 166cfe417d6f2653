// inspecta - capture inspection results and compare them against a baseline

mod capture;
mod compare;
mod exit_codes;
mod standards;
mod table;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use inspecta_compare::CompareError;
use inspecta_config::{ConfigError, StandardStore};
use inspecta_io::IoError;

use exit_codes::{compare_exit_code, config_exit_code, io_exit_code, EXIT_SUCCESS, EXIT_USAGE};

/// Env var holding the log filter (env-filter syntax, e.g. `inspecta_compare=debug`).
const LOG_ENV: &str = "INSPECTA_LOG";

#[derive(Parser)]
#[command(name = "inspecta")]
#[command(about = "Capture inspection results and judge them against a baseline")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Standards file (default: <config dir>/inspecta/standards.json)
    #[arg(long, global = true, env = "INSPECTA_STANDARDS")]
    standards: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded detection results (JSON lines) into a measurement table
    #[command(after_help = "\
Examples:
  inspecta capture results.jsonl baseline/recipe-7.csv
  inspecta capture today.jsonl runs/2024-05-03.csv")]
    Capture {
        /// JSON lines file, one detection result (group, sample, ok, defect_type, items) per line
        results: PathBuf,

        /// Measurement table to write (replaced atomically)
        output: PathBuf,
    },

    /// Compare a test table against a reference table
    #[command(after_help = "\
Examples:
  inspecta compare baseline.csv today.csv
  inspecta compare baseline.csv today.csv --standard strict
  inspecta compare baseline.csv today.csv --scope recipe-7 --json
  inspecta compare baseline.csv today.csv --output report.json

Exit codes: 0 PASS, 3 FAIL, 4 missing baseline, 5 missing test table")]
    Compare {
        /// Reference (baseline) table
        reference: PathBuf,

        /// Test table
        test: PathBuf,

        /// Standard to judge by
        #[arg(long, conflicts_with = "scope")]
        standard: Option<String>,

        /// Use the standard bound to this scope (e.g. a recipe name)
        #[arg(long)]
        scope: Option<String>,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Manage acceptance standards
    #[command(subcommand)]
    Standards(standards::StandardsCommands),

    /// Inspect measurement tables
    #[command(subcommand)]
    Table(table::TableCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ")",
        "\ntarget:  ",
        env!("TARGET"),
    )
}

/// Route `log` records from the library crates to stderr.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let standards_path = cli.standards.unwrap_or_else(StandardStore::default_path);

    let result = match cli.command {
        None => {
            eprintln!("Usage: inspecta <command> [options]");
            eprintln!("       inspecta --help for more information");
            Ok(())
        }
        Some(Commands::Capture { results, output }) => capture::cmd_capture(results, output),
        Some(Commands::Compare {
            reference,
            test,
            standard,
            scope,
            json,
            output,
        }) => compare::cmd_compare(&standards_path, reference, test, standard, scope, json, output),
        Some(Commands::Standards(cmd)) => standards::cmd_standards(&standards_path, cmd),
        Some(Commands::Table(cmd)) => table::cmd_table(cmd),
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
        Self::new(io_exit_code(&err), err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let error = Self::new(config_exit_code(&err), err.to_string());
        match err {
            ConfigError::UnknownStandard(_) => error.with_hint("run `inspecta standards list` to see defined standards"),
            ConfigError::Parse { .. } => error.with_hint("fix the JSON or pass another file with --standards"),
            _ => error,
        }
    }
}

impl From<CompareError> for CliError {
    fn from(err: CompareError) -> Self {
        match err {
            CompareError::Config(e) => e.into(),
            CompareError::Table(e) => e.into(),
            CompareError::MissingBaselineFile { .. } => Self::new(compare_exit_code(&err), err.to_string())
                .with_hint("record a baseline with `inspecta capture <results.jsonl> <reference.csv>`"),
            _ => Self::new(compare_exit_code(&err), err.to_string()),
        }
    }
}

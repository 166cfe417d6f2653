//! `inspecta compare` - judge a test table against the baseline.

use std::path::{Path, PathBuf};

use inspecta_compare::{compare_with_store, StandardSelection};
use inspecta_config::StandardStore;

use crate::exit_codes::{EXIT_COMPARE_FAIL, EXIT_TABLE_IO};
use crate::CliError;

pub fn cmd_compare(
    standards_path: &Path,
    reference: PathBuf,
    test: PathBuf,
    standard: Option<String>,
    scope: Option<String>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let store = StandardStore::load(standards_path)?;
    log::debug!("standards from {}", standards_path.display());

    let selection = match (standard.as_deref(), scope.as_deref()) {
        (Some(name), _) => StandardSelection::Named(name),
        (None, Some(scope)) => StandardSelection::Scope(scope),
        (None, None) => StandardSelection::Default,
    };
    let outcome = compare_with_store(&reference, &test, &store, selection)?;

    if json_output || output_file.is_some() {
        let json_str = serde_json::to_string_pretty(&outcome.report)
            .map_err(|e| CliError::new(EXIT_TABLE_IO, format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = output_file {
            std::fs::write(path, &json_str).map_err(|e| {
                CliError::new(EXIT_TABLE_IO, format!("cannot write {}: {e}", path.display()))
            })?;
            eprintln!("wrote {}", path.display());
        }
        if json_output {
            println!("{json_str}");
        }
    }
    if !json_output {
        print!("{}", outcome.text);
    }

    if outcome.passed {
        Ok(())
    } else {
        Err(CliError::new(
            EXIT_COMPARE_FAIL,
            format!("acceptance check failed under standard '{}'", outcome.report.standard),
        ))
    }
}

//! `inspecta capture` - replay recorded detection results into a table.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use inspecta_compare::{capture, CancelToken, ReplayPipeline};

use crate::exit_codes::EXIT_USAGE;
use crate::CliError;

pub fn cmd_capture(results: PathBuf, output: PathBuf) -> Result<(), CliError> {
    let file = File::open(&results).map_err(|e| {
        CliError::new(EXIT_USAGE, format!("cannot open {}: {e}", results.display()))
    })?;
    let (mut pipeline, plan) = ReplayPipeline::from_json_lines(BufReader::new(file))?;
    if plan.is_empty() {
        return Err(CliError::args(format!("{} holds no detection results", results.display())));
    }

    let summary = capture(&mut pipeline, &plan, &output, &CancelToken::new())?;
    eprintln!(
        "captured {} samples ({} OK, {} NG) -> {}",
        summary.rows,
        summary.ok,
        summary.ng,
        output.display()
    );
    Ok(())
}

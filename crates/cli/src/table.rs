//! `inspecta table` - look inside a measurement table.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;

use inspecta_io::{read_table, ReadOutcome};

use crate::exit_codes::EXIT_TABLE_IO;
use crate::CliError;

#[derive(Subcommand)]
pub enum TableCommands {
    /// Show row counts, item columns and skipped lines
    #[command(after_help = "\
Examples:
  inspecta table inspect baseline.csv
  inspecta table inspect baseline.csv --json")]
    Inspect {
        /// Measurement table (CSV)
        path: PathBuf,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_table(cmd: TableCommands) -> Result<(), CliError> {
    match cmd {
        TableCommands::Inspect { path, json } => cmd_table_inspect(path, json),
    }
}

#[derive(Debug, Serialize)]
struct TableSummary {
    path: String,
    rows: usize,
    unique_samples: usize,
    groups: usize,
    ok: usize,
    ng: usize,
    item_columns: Vec<String>,
    skipped: Vec<SkippedLine>,
}

#[derive(Debug, Serialize)]
struct SkippedLine {
    line: u64,
    reason: String,
}

fn summarize(path: &str, outcome: &ReadOutcome) -> TableSummary {
    let table = &outcome.table;
    let ok = table.rows().iter().filter(|r| r.ok).count();
    TableSummary {
        path: path.to_string(),
        rows: table.len(),
        unique_samples: table.keyed().len(),
        groups: table.groups().len(),
        ok,
        ng: table.len() - ok,
        item_columns: table.item_columns().to_vec(),
        skipped: outcome
            .skipped
            .iter()
            .map(|s| SkippedLine { line: s.line, reason: s.reason.clone() })
            .collect(),
    }
}

fn cmd_table_inspect(path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let outcome = read_table(&path)?;
    let summary = summarize(&path.display().to_string(), &outcome);

    if json_output {
        let json_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::new(EXIT_TABLE_IO, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!("table:   {}", summary.path);
    println!(
        "rows:    {} ({} unique samples, {} groups)",
        summary.rows, summary.unique_samples, summary.groups
    );
    println!("result:  {} OK, {} NG", summary.ok, summary.ng);
    if summary.item_columns.is_empty() {
        println!("items:   (none)");
    } else {
        println!("items:   {}", summary.item_columns.join(", "));
    }
    if !summary.skipped.is_empty() {
        println!("skipped: {}", summary.skipped.len());
        for s in &summary.skipped {
            println!("  line {}: {}", s.line, s.reason);
        }
    }
    Ok(())
}

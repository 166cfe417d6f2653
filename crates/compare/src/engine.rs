use std::path::{Path, PathBuf};

use inspecta_config::{AcceptanceStandard, ConfigError, StandardStore};
use inspecta_io::{read_table, IoError, MeasurementTable, ReadOutcome};

use crate::error::CompareError;
use crate::extent::compare_extents;
use crate::model::{CompareOptions, CompareReport, Listing};
use crate::report::render_report;
use crate::rows::compare_rows;
use crate::verdict;

/// Compare two in-memory tables under a standard snapshot.
pub fn compare_tables(
    reference: &MeasurementTable,
    test: &MeasurementTable,
    standard: &AcceptanceStandard,
    options: &CompareOptions,
) -> CompareReport {
    let rows = compare_rows(reference, test, standard, options);
    let extents = compare_extents(reference, test, standard, options);
    let rules = verdict::evaluate(&rows, &extents, standard);
    let passed = verdict::passed(&rules);

    CompareReport {
        reference_path: None,
        test_path: None,
        standard: standard.name.clone(),
        reference_rows: reference.len(),
        test_rows: test.len(),
        matched_rows: rows.matched,
        skipped_rows: 0,
        missing: Listing::capped(rows.missing),
        extra: Listing::capped(rows.extra),
        ok_ng_mismatches: Listing::capped(rows.ok_ng_mismatches),
        defect_mismatches: Listing::capped(rows.defect_mismatches),
        extent_mismatches: Listing::capped(extents.mismatches),
        extents_compared: extents.compared,
        item_mismatches: Listing::capped(rows.item_mismatches),
        rules,
        passed,
    }
}

/// What to compare: both table paths plus the standard to judge by.
#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub reference_path: PathBuf,
    pub test_path: PathBuf,
    pub standard: AcceptanceStandard,
    pub options: CompareOptions,
}

#[derive(Debug, Clone)]
pub struct CompareOutcome {
    pub report: CompareReport,
    pub text: String,
    pub passed: bool,
}

/// Load both tables from disk, compare them and render the report.
pub fn compare_files(request: &CompareRequest) -> Result<CompareOutcome, CompareError> {
    let reference = load(&request.reference_path, |path| CompareError::MissingBaselineFile { path })?;
    let test = load(&request.test_path, |path| CompareError::MissingTestFile { path })?;

    let mut report = compare_tables(&reference.table, &test.table, &request.standard, &request.options);
    report.reference_path = Some(request.reference_path.display().to_string());
    report.test_path = Some(request.test_path.display().to_string());
    report.skipped_rows = reference.skipped.len() + test.skipped.len();

    log::info!(
        "compared {} vs {} under '{}': {} ({} matched, {} missing, {} extra)",
        request.reference_path.display(),
        request.test_path.display(),
        report.standard,
        if report.passed { "PASS" } else { "FAIL" },
        report.matched_rows,
        report.missing.count,
        report.extra.count,
    );

    let text = render_report(&report);
    let passed = report.passed;
    Ok(CompareOutcome { report, text, passed })
}

/// Which standard `compare_with_store` judges by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardSelection<'a> {
    /// A standard by name; an unknown name is an error.
    Named(&'a str),
    /// The standard bound to a scope, or `default` when unbound.
    Scope(&'a str),
    Default,
}

/// Compare with a standard and the ignore-set taken from `store`.
pub fn compare_with_store(
    reference_path: &Path,
    test_path: &Path,
    store: &StandardStore,
    selection: StandardSelection<'_>,
) -> Result<CompareOutcome, CompareError> {
    let standard = match selection {
        StandardSelection::Named(name) => store
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownStandard(name.to_string()))?,
        StandardSelection::Scope(scope) => store.resolve_active(scope),
        StandardSelection::Default => store.resolve_active(""),
    };
    log::debug!("judging with standard '{}'", standard.name);
    compare_files(&CompareRequest {
        reference_path: reference_path.to_path_buf(),
        test_path: test_path.to_path_buf(),
        standard,
        options: CompareOptions::from_store(store),
    })
}

fn load(path: &Path, missing: impl FnOnce(PathBuf) -> CompareError) -> Result<ReadOutcome, CompareError> {
    match read_table(path) {
        Ok(outcome) => {
            for row in &outcome.skipped {
                log::warn!("{}: line {} skipped: {}", path.display(), row.line, row.reason);
            }
            Ok(outcome)
        }
        Err(IoError::MissingFile { path }) => Err(missing(path)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspecta_io::{ItemValues, MeasurementRow};

    fn row(group: &str, sample: &str, ok: bool, temp: &str) -> MeasurementRow {
        MeasurementRow {
            group: group.into(),
            sample: sample.into(),
            timestamp: String::new(),
            ok,
            defect_type: if ok { String::new() } else { "Scratch".into() },
            values: [("temp", temp)].into_iter().collect::<ItemValues>(),
        }
    }

    #[test]
    fn self_comparison_passes_clean() {
        let table = MeasurementTable::new(vec![
            row("G1", "1", true, "10.0"),
            row("G1", "2", false, "11.5"),
            row("G2", "1", true, "n/a"),
        ]);
        let report = compare_tables(&table, &table, &AcceptanceStandard::new("default"), &CompareOptions::default());
        assert!(report.passed);
        assert_eq!(report.matched_rows, 3);
        assert_eq!(report.missing.count, 0);
        assert_eq!(report.extra.count, 0);
        assert_eq!(report.ok_ng_mismatches.count, 0);
        assert_eq!(report.defect_mismatches.count, 0);
        assert_eq!(report.extent_mismatches.count, 0);
        assert_eq!(report.item_mismatches.count, 0);
        assert_eq!(report.extents_compared, 1);
    }

    #[test]
    fn missing_row_counts_once_and_fails() {
        let reference = MeasurementTable::new(vec![row("G1", "1", true, "1"), row("G1", "2", false, "1")]);
        let test = MeasurementTable::new(vec![row("G1", "1", true, "1")]);
        let standard = AcceptanceStandard::new("lenient").with_allowances(9, 9, 9);
        let report = compare_tables(&reference, &test, &standard, &CompareOptions::default());
        assert!(!report.passed);
        assert_eq!(report.missing.examples, vec!["G1#2"]);
        assert_eq!(report.ok_ng_mismatches.count, 0);
        assert_eq!(report.defect_mismatches.count, 0);
        assert_eq!(report.standard, "lenient");
    }

    #[test]
    fn unknown_standard_name_is_config_error() {
        let err = compare_with_store(
            Path::new("ref.csv"),
            Path::new("test.csv"),
            &StandardStore::new(),
            StandardSelection::Named("ghost"),
        )
        .unwrap_err();
        assert!(matches!(err, CompareError::Config(ConfigError::UnknownStandard(_))));
    }

    #[test]
    fn missing_files_map_to_their_own_errors() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("ref.csv");
        let test = dir.path().join("test.csv");
        let request = CompareRequest {
            reference_path: reference.clone(),
            test_path: test.clone(),
            standard: AcceptanceStandard::new("default"),
            options: CompareOptions::default(),
        };
        assert!(matches!(
            compare_files(&request),
            Err(CompareError::MissingBaselineFile { .. })
        ));

        std::fs::write(&reference, "group,sample,result\n").unwrap();
        assert!(matches!(
            compare_files(&request),
            Err(CompareError::MissingTestFile { .. })
        ));
    }
}

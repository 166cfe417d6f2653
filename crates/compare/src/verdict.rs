use inspecta_config::AcceptanceStandard;

use crate::model::{ExtentComparison, RowComparison, Rule, RuleOutcome};

/// Evaluate each acceptance rule. Missing and extra rows have no allowance.
///
/// Per-item differences have no rule here.
pub fn evaluate(
    rows: &RowComparison,
    extents: &ExtentComparison,
    standard: &AcceptanceStandard,
) -> Vec<RuleOutcome> {
    let check = |rule, actual: usize, allowed: u32| {
        let allowed = allowed as usize;
        RuleOutcome {
            rule,
            actual,
            allowed,
            passed: actual <= allowed,
        }
    };

    vec![
        check(Rule::MissingRows, rows.missing.len(), 0),
        check(Rule::ExtraRows, rows.extra.len(), 0),
        check(Rule::OkNgMismatch, rows.ok_ng_mismatches.len(), standard.allowed_ok_ng_mismatch),
        check(Rule::DefectMismatch, rows.defect_mismatches.len(), standard.allowed_defect_mismatch),
        check(Rule::ExtentMismatch, extents.mismatches.len(), standard.allowed_extent_mismatch),
    ]
}

pub fn passed(outcomes: &[RuleOutcome]) -> bool {
    outcomes.iter().all(|o| o.passed)
}

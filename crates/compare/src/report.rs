use std::fmt::Write as _;

use crate::model::{CompareReport, ItemDifference, Listing};
use crate::numeric::format_number;

/// Human-readable report. Deterministic for a given `CompareReport`.
pub fn render_report(report: &CompareReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Reference: {}", path_label(&report.reference_path));
    let _ = writeln!(out, "Test:      {}", path_label(&report.test_path));
    let _ = writeln!(out, "Standard:  {}", report.standard);
    let _ = writeln!(
        out,
        "Rows: {} reference, {} test, {} matched",
        report.reference_rows, report.test_rows, report.matched_rows
    );
    if report.skipped_rows > 0 {
        let _ = writeln!(out, "Skipped malformed rows: {}", report.skipped_rows);
    }
    out.push('\n');

    section(&mut out, "Missing rows (in reference, not in test)", &report.missing, |k| k.clone());
    section(&mut out, "Extra rows (in test, not in reference)", &report.extra, |k| k.clone());
    section(&mut out, "OK/NG mismatches", &report.ok_ng_mismatches, |m| {
        format!("{}: {} -> {}", m.key, ok_label(m.reference_ok), ok_label(m.test_ok))
    });
    section(&mut out, "Defect-type mismatches", &report.defect_mismatches, |m| {
        format!("{}: {} -> {}", m.key, or_blank(&m.reference_defect), or_blank(&m.test_defect))
    });
    section(&mut out, "Extent mismatches", &report.extent_mismatches, |m| {
        format!(
            "{} / {}: extent {} -> {} (diff {}, threshold {})",
            m.group,
            m.item,
            format_number(m.reference_extent),
            format_number(m.test_extent),
            format_number(m.diff),
            format_number(m.threshold),
        )
    });
    section(
        &mut out,
        "Item differences (informational)",
        &report.item_mismatches,
        |m| format!("{} {}: {}", m.key, m.item, describe(&m.difference)),
    );

    out.push_str("Rules:\n");
    for rule in &report.rules {
        let _ = writeln!(
            out,
            "  [{}] {}: {} (allowed {})",
            if rule.passed { "PASS" } else { "FAIL" },
            rule.rule,
            rule.actual,
            rule.allowed
        );
    }
    out.push('\n');
    let _ = writeln!(out, "RESULT: {}", if report.passed { "PASS" } else { "FAIL" });
    out
}

fn section<T>(out: &mut String, title: &str, listing: &Listing<T>, line: impl Fn(&T) -> String) {
    let _ = writeln!(out, "{title}: {}", listing.count);
    for entry in &listing.examples {
        let _ = writeln!(out, "  {}", line(entry));
    }
    if listing.hidden() > 0 {
        let _ = writeln!(out, "  ... and {} more", listing.hidden());
    }
    out.push('\n');
}

fn describe(difference: &ItemDifference) -> String {
    match difference {
        ItemDifference::OutOfTolerance { reference, test, diff, threshold } => format!(
            "{} -> {} (diff {}, threshold {})",
            format_number(*reference),
            format_number(*test),
            format_number(*diff),
            format_number(*threshold),
        ),
        ItemDifference::TextChanged { reference, test } => {
            format!("{:?} -> {:?}", reference, test)
        }
        ItemDifference::BecameNonNumeric { reference, test } => {
            format!("{} -> {:?} (no longer numeric)", format_number(*reference), test)
        }
        ItemDifference::BecameNumeric { reference, test } => {
            format!("{:?} -> {} (became numeric)", reference, format_number(*test))
        }
    }
}

fn path_label(path: &Option<String>) -> &str {
    path.as_deref().unwrap_or("(in memory)")
}

fn ok_label(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "NG"
    }
}

fn or_blank(s: &str) -> &str {
    if s.is_empty() {
        "(blank)"
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtentMismatch, ItemMismatch, OkNgMismatch, Rule, RuleOutcome, MAX_LISTED};

    fn empty_report() -> CompareReport {
        CompareReport {
            reference_path: Some("ref.csv".into()),
            test_path: None,
            standard: "default".into(),
            reference_rows: 2,
            test_rows: 2,
            matched_rows: 2,
            skipped_rows: 0,
            missing: Listing::capped(vec![]),
            extra: Listing::capped(vec![]),
            ok_ng_mismatches: Listing::capped(vec![]),
            defect_mismatches: Listing::capped(vec![]),
            extent_mismatches: Listing::capped(vec![]),
            extents_compared: 0,
            item_mismatches: Listing::capped(vec![]),
            rules: vec![RuleOutcome {
                rule: Rule::MissingRows,
                actual: 0,
                allowed: 0,
                passed: true,
            }],
            passed: true,
        }
    }

    #[test]
    fn header_and_result() {
        let text = render_report(&empty_report());
        assert!(text.starts_with("Reference: ref.csv\nTest:      (in memory)\n"));
        assert!(text.contains("Standard:  default"));
        assert!(text.contains("Rows: 2 reference, 2 test, 2 matched"));
        assert!(!text.contains("Skipped"));
        assert!(text.contains("  [PASS] missing rows: 0 (allowed 0)"));
        assert!(text.trim_end().ends_with("RESULT: PASS"));
    }

    #[test]
    fn long_listing_is_capped() {
        let mut report = empty_report();
        let keys: Vec<String> = (0..MAX_LISTED + 7).map(|i| format!("G#{i:03}")).collect();
        report.missing = Listing::capped(keys);
        report.passed = false;

        let text = render_report(&report);
        assert!(text.contains(&format!("Missing rows (in reference, not in test): {}", MAX_LISTED + 7)));
        assert!(text.contains("  G#000\n"));
        assert!(!text.contains(&format!("G#{:03}", MAX_LISTED)));
        assert!(text.contains("  ... and 7 more"));
        assert!(text.trim_end().ends_with("RESULT: FAIL"));
    }

    #[test]
    fn findings_are_rendered() {
        let mut report = empty_report();
        report.skipped_rows = 3;
        report.ok_ng_mismatches = Listing::capped(vec![OkNgMismatch {
            key: "G1#2".into(),
            reference_ok: true,
            test_ok: false,
        }]);
        report.extent_mismatches = Listing::capped(vec![ExtentMismatch {
            group: "G1".into(),
            item: "temp".into(),
            reference_extent: 0.2,
            test_extent: 0.6000000000000001,
            diff: 0.4000000000000001,
            threshold: 0.1,
        }]);
        report.item_mismatches = Listing::capped(vec![ItemMismatch {
            key: "G1#1".into(),
            item: "shape".into(),
            difference: ItemDifference::TextChanged {
                reference: "round".into(),
                test: "square".into(),
            },
        }]);

        let text = render_report(&report);
        assert!(text.contains("Skipped malformed rows: 3"));
        assert!(text.contains("  G1#2: OK -> NG"));
        assert!(text.contains("  G1 / temp: extent 0.2 -> 0.6 (diff 0.4, threshold 0.1)"));
        assert!(text.contains("  G1#1 shape: \"round\" -> \"square\""));
    }

    #[test]
    fn rendering_is_deterministic() {
        let report = empty_report();
        assert_eq!(render_report(&report), render_report(&report));
    }
}

use inspecta_config::Tolerance;

use crate::model::ItemDifference;

/// Interpret a raw cell as a number.
///
/// Tries the invariant form first (`.` decimal separator), then a
/// decimal-comma form (`12,5`). Blank and non-finite values are text.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>()
        .ok()
        .or_else(|| parse_decimal_comma(s))
        .filter(|v| v.is_finite())
}

fn parse_decimal_comma(s: &str) -> Option<f64> {
    if s.contains('.') || s.matches(',').count() != 1 {
        return None;
    }
    s.replace(',', ".").parse::<f64>().ok()
}

/// Compare one item's raw values. `None` means equivalent.
pub fn compare_values(reference: &str, test: &str, tolerance: Tolerance) -> Option<ItemDifference> {
    match (parse_numeric(reference), parse_numeric(test)) {
        (Some(r), Some(t)) => {
            let threshold = tolerance.threshold(r);
            let diff = (t - r).abs();
            (diff > threshold).then_some(ItemDifference::OutOfTolerance {
                reference: r,
                test: t,
                diff,
                threshold,
            })
        }
        (None, None) => {
            let equal = reference.trim().to_lowercase() == test.trim().to_lowercase();
            (!equal).then(|| ItemDifference::TextChanged {
                reference: reference.trim().to_string(),
                test: test.trim().to_string(),
            })
        }
        (Some(r), None) => Some(ItemDifference::BecameNonNumeric {
            reference: r,
            test: test.trim().to_string(),
        }),
        (None, Some(t)) => Some(ItemDifference::BecameNumeric {
            reference: reference.trim().to_string(),
            test: t,
        }),
    }
}

/// Fixed-precision rendering for reports: up to 6 decimals, trailing zeros cut.
pub fn format_number(v: f64) -> String {
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

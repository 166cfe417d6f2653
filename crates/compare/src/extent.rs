use std::collections::BTreeMap;

use inspecta_config::AcceptanceStandard;
use inspecta_io::{MeasurementRow, MeasurementTable};

use crate::model::{CompareOptions, ExtentComparison, ExtentMismatch};
use crate::numeric::parse_numeric;

/// Compare the spread (max - min) of every numeric item per group.
///
/// Only groups present in both tables are compared. Output is ordered by
/// folded group name, then item.
pub fn compare_extents(
    reference: &MeasurementTable,
    test: &MeasurementTable,
    standard: &AcceptanceStandard,
    options: &CompareOptions,
) -> ExtentComparison {
    let reference_groups = reference.groups();
    let test_groups = test.groups();

    let mut out = ExtentComparison::default();

    for (group_key, ref_rows) in &reference_groups {
        let Some(test_rows) = test_groups.get(group_key) else {
            continue;
        };
        let group = ref_rows
            .first()
            .map(|r| r.group.trim().to_string())
            .unwrap_or_else(|| group_key.clone());

        for item in group_items(ref_rows, test_rows) {
            if options.is_ignored(&item) {
                continue;
            }
            let (Some(ref_extent), Some(test_extent)) =
                (extent_of(ref_rows, &item), extent_of(test_rows, &item))
            else {
                continue;
            };
            out.compared += 1;

            let tolerance = standard.tolerance_for(&item);
            let threshold = tolerance.threshold(ref_extent);
            let diff = (test_extent - ref_extent).abs();
            if diff > threshold {
                log::debug!(
                    "group '{group}' item '{item}': extent {ref_extent} -> {test_extent} exceeds {threshold}"
                );
                out.mismatches.push(ExtentMismatch {
                    group: group.clone(),
                    item,
                    reference_extent: ref_extent,
                    test_extent,
                    diff,
                    threshold,
                });
            }
        }
    }

    out
}

/// `max - min` of the item's numeric values; `None` if none parse.
fn extent_of(rows: &[&MeasurementRow], item: &str) -> Option<f64> {
    let mut values = rows.iter().filter_map(|r| parse_numeric(r.value(item)));
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Some(max - min)
}

/// Item names appearing in either side's rows, case-insensitive, sorted.
fn group_items(a: &[&MeasurementRow], b: &[&MeasurementRow]) -> Vec<String> {
    let mut names: BTreeMap<String, String> = BTreeMap::new();
    for row in a.iter().chain(b.iter()) {
        for name in row.values.names() {
            names.entry(name.to_lowercase()).or_insert_with(|| name.to_string());
        }
    }
    names.into_values().collect()
}

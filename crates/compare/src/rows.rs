use std::collections::BTreeMap;

use inspecta_config::AcceptanceStandard;
use inspecta_io::{MeasurementRow, MeasurementTable};

use crate::model::{CompareOptions, DefectMismatch, ItemMismatch, OkNgMismatch, RowComparison};
use crate::numeric::compare_values;

/// Join reference and test rows by sample key and classify each key.
pub fn compare_rows(
    reference: &MeasurementTable,
    test: &MeasurementTable,
    standard: &AcceptanceStandard,
    options: &CompareOptions,
) -> RowComparison {
    let reference_map = reference.keyed();
    let test_map = test.keyed();

    let mut out = RowComparison::default();

    for (key, ref_row) in &reference_map {
        let Some(test_row) = test_map.get(key) else {
            out.missing.push(ref_row.display_key());
            continue;
        };
        out.matched += 1;
        let display = ref_row.display_key();

        if ref_row.ok != test_row.ok {
            out.ok_ng_mismatches.push(OkNgMismatch {
                key: display.clone(),
                reference_ok: ref_row.ok,
                test_ok: test_row.ok,
            });
        } else if !ref_row.ok && !same_defect(&ref_row.defect_type, &test_row.defect_type) {
            out.defect_mismatches.push(DefectMismatch {
                key: display.clone(),
                reference_defect: ref_row.defect_type.trim().to_string(),
                test_defect: test_row.defect_type.trim().to_string(),
            });
        }

        for item in union_items(ref_row, test_row) {
            if options.is_ignored(&item) {
                continue;
            }
            let tolerance = standard.tolerance_for(&item);
            if let Some(difference) = compare_values(ref_row.value(&item), test_row.value(&item), tolerance) {
                log::debug!("{display}: item '{item}' differs: {difference:?}");
                out.item_mismatches.push(ItemMismatch {
                    key: display.clone(),
                    item,
                    difference,
                });
            }
        }
    }

    for (key, test_row) in &test_map {
        if !reference_map.contains_key(key) {
            out.extra.push(test_row.display_key());
        }
    }

    log::debug!(
        "row comparison: {} matched, {} missing, {} extra, {} OK/NG, {} defect, {} item",
        out.matched,
        out.missing.len(),
        out.extra.len(),
        out.ok_ng_mismatches.len(),
        out.defect_mismatches.len(),
        out.item_mismatches.len(),
    );
    out
}

fn same_defect(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Item names present in either row, case-insensitive, sorted.
fn union_items(a: &MeasurementRow, b: &MeasurementRow) -> Vec<String> {
    let mut names: BTreeMap<String, String> = BTreeMap::new();
    for name in a.values.names().chain(b.values.names()) {
        names.entry(name.to_lowercase()).or_insert_with(|| name.to_string());
    }
    names.into_values().collect()
}

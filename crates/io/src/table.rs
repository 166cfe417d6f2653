use std::collections::{BTreeMap, HashSet};

use crate::model::{fold, MeasurementRow, SampleKey};

/// A parsed measurement table: item column schema plus rows in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementTable {
    item_columns: Vec<String>,
    rows: Vec<MeasurementRow>,
}

impl MeasurementTable {
    /// Build a table whose schema is the union of all rows' item names.
    pub fn new(rows: Vec<MeasurementRow>) -> Self {
        let item_columns = item_schema(&rows);
        Self { item_columns, rows }
    }

    /// Build a table with an explicit schema (as read from a header).
    pub fn from_parts(item_columns: Vec<String>, rows: Vec<MeasurementRow>) -> Self {
        Self { item_columns, rows }
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<MeasurementRow> {
        self.rows
    }

    pub fn item_columns(&self) -> &[String] {
        &self.item_columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows by sample key. Later rows replace earlier ones with the same key;
    /// rows with a blank key are left out.
    pub fn keyed(&self) -> BTreeMap<SampleKey, &MeasurementRow> {
        let mut map = BTreeMap::new();
        for row in &self.rows {
            if let Some(key) = row.key() {
                map.insert(key, row);
            }
        }
        map
    }

    /// Key-deduplicated rows grouped by folded group name.
    pub fn groups(&self) -> BTreeMap<String, Vec<&MeasurementRow>> {
        let mut groups: BTreeMap<String, Vec<&MeasurementRow>> = BTreeMap::new();
        for row in self.keyed().into_values() {
            groups.entry(fold(&row.group)).or_default().push(row);
        }
        groups
    }
}

/// Case-insensitive union of item names, sorted case-insensitively ascending.
/// The first spelling seen is kept.
pub fn item_schema<'a>(rows: impl IntoIterator<Item = &'a MeasurementRow>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for row in rows {
        for name in row.values.names() {
            if seen.insert(fold(name)) {
                names.push(name.to_string());
            }
        }
    }
    sort_case_insensitive(&mut names);
    names
}

pub(crate) fn sort_case_insensitive(names: &mut [String]) {
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

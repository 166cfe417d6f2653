use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Fold an item or key name for case-insensitive comparison.
pub fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Input from the detection pipeline
// ---------------------------------------------------------------------------

/// One named measurement as reported by the detection pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub value: String,
}

/// The result of running detection on one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub group: String,
    pub sample: String,
    pub ok: bool,
    /// Defect classification. Only meaningful when `ok` is false.
    #[serde(default)]
    pub defect_type: String,
    #[serde(default)]
    pub items: Vec<Measurement>,
}

// ---------------------------------------------------------------------------
// Item values
// ---------------------------------------------------------------------------

/// Insertion-ordered item name → raw value map with case-insensitive names.
///
/// Re-inserting a name (in any casing) replaces the value in place and keeps
/// the first spelling and position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemValues {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ItemValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let folded = fold(&name);
        match self.index.get(&folded) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(folded, self.entries.len());
                self.entries.push((name.trim().to_string(), value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(&fold(name))
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&fold(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for ItemValues {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

// ---------------------------------------------------------------------------
// Sample key
// ---------------------------------------------------------------------------

/// Case-insensitive sample identity: `group#sample`, folded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleKey(String);

impl SampleKey {
    /// Returns `None` for a blank key (both group and sample empty).
    pub fn new(group: &str, sample: &str) -> Option<Self> {
        let group = group.trim();
        let sample = sample.trim();
        if group.is_empty() && sample.is_empty() {
            return None;
        }
        Some(Self(format!("{}#{}", group, sample).to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One sample's line in a reference or test table.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub group: String,
    pub sample: String,
    pub timestamp: String,
    pub ok: bool,
    pub defect_type: String,
    pub values: ItemValues,
}

impl MeasurementRow {
    pub fn from_detection(result: DetectionResult, timestamp: impl Into<String>) -> Self {
        let values = result
            .items
            .into_iter()
            .map(|m| (m.name, m.value))
            .collect();
        Self {
            group: result.group,
            sample: result.sample,
            timestamp: timestamp.into(),
            ok: result.ok,
            defect_type: result.defect_type,
            values,
        }
    }

    pub fn key(&self) -> Option<SampleKey> {
        SampleKey::new(&self.group, &self.sample)
    }

    /// Key with the row's own spelling, for reports.
    pub fn display_key(&self) -> String {
        format!("{}#{}", self.group.trim(), self.sample.trim())
    }

    /// Raw value of an item; absent items read as the empty string.
    pub fn value(&self, item: &str) -> &str {
        self.values.get(item).unwrap_or("")
    }

    pub fn result_label(&self) -> &'static str {
        if self.ok {
            "OK"
        } else {
            "NG"
        }
    }
}

use serde::Serialize;

use inspecta_config::StandardStore;

/// Cap on example entries listed per category in a report.
pub const MAX_LISTED: usize = 50;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Item columns never compared (e.g. a capture-time column).
    pub ignored_items: Vec<String>,
}

impl CompareOptions {
    pub fn from_store(store: &StandardStore) -> Self {
        Self {
            ignored_items: store.ignored_items.clone(),
        }
    }

    pub fn is_ignored(&self, item: &str) -> bool {
        let item = item.trim().to_lowercase();
        self.ignored_items
            .iter()
            .any(|i| i.trim().to_lowercase() == item)
    }
}

// ---------------------------------------------------------------------------
// Row-level findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OkNgMismatch {
    pub key: String,
    pub reference_ok: bool,
    pub test_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectMismatch {
    pub key: String,
    pub reference_defect: String,
    pub test_defect: String,
}

/// How a single item differs between the reference and test row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDifference {
    OutOfTolerance {
        reference: f64,
        test: f64,
        diff: f64,
        threshold: f64,
    },
    TextChanged {
        reference: String,
        test: String,
    },
    BecameNonNumeric {
        reference: f64,
        test: String,
    },
    BecameNumeric {
        reference: String,
        test: f64,
    },
}

/// Per-sample item difference. Informational: never part of the verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemMismatch {
    pub key: String,
    pub item: String,
    pub difference: ItemDifference,
}

/// Output of the row comparator. Every list is sorted by sample key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowComparison {
    pub matched: usize,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub ok_ng_mismatches: Vec<OkNgMismatch>,
    pub defect_mismatches: Vec<DefectMismatch>,
    pub item_mismatches: Vec<ItemMismatch>,
}

// ---------------------------------------------------------------------------
// Group-level findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtentMismatch {
    pub group: String,
    pub item: String,
    pub reference_extent: f64,
    pub test_extent: f64,
    pub diff: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtentComparison {
    /// (group, item) pairs that had numeric values on both sides.
    pub compared: usize,
    pub mismatches: Vec<ExtentMismatch>,
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    MissingRows,
    ExtraRows,
    OkNgMismatch,
    DefectMismatch,
    ExtentMismatch,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRows => write!(f, "missing rows"),
            Self::ExtraRows => write!(f, "extra rows"),
            Self::OkNgMismatch => write!(f, "OK/NG mismatches"),
            Self::DefectMismatch => write!(f, "defect-type mismatches"),
            Self::ExtentMismatch => write!(f, "extent mismatches"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub rule: Rule,
    pub actual: usize,
    pub allowed: usize,
    pub passed: bool,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Total count plus the first `MAX_LISTED` entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub count: usize,
    pub examples: Vec<T>,
}

impl<T> Listing<T> {
    pub fn capped(mut all: Vec<T>) -> Self {
        let count = all.len();
        all.truncate(MAX_LISTED);
        Self { count, examples: all }
    }

    /// Entries beyond the listed examples.
    pub fn hidden(&self) -> usize {
        self.count - self.examples.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareReport {
    pub reference_path: Option<String>,
    pub test_path: Option<String>,
    pub standard: String,
    pub reference_rows: usize,
    pub test_rows: usize,
    pub matched_rows: usize,
    /// Malformed or blank-key lines dropped while reading both tables.
    pub skipped_rows: usize,
    pub missing: Listing<String>,
    pub extra: Listing<String>,
    pub ok_ng_mismatches: Listing<OkNgMismatch>,
    pub defect_mismatches: Listing<DefectMismatch>,
    pub extent_mismatches: Listing<ExtentMismatch>,
    pub extents_compared: usize,
    pub item_mismatches: Listing<ItemMismatch>,
    pub rules: Vec<RuleOutcome>,
    pub passed: bool,
}

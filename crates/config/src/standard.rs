use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The privileged standard. Always present, never renamed or deleted.
pub const DEFAULT_STANDARD: &str = "default";

pub fn is_default_name(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(DEFAULT_STANDARD)
}

fn clamp_non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Absolute + proportional tolerance pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub abs: f64,
    pub ratio: f64,
}

impl Tolerance {
    /// Negative or non-finite inputs become 0.
    pub fn new(abs: f64, ratio: f64) -> Self {
        Self {
            abs: clamp_non_negative(abs),
            ratio: clamp_non_negative(ratio),
        }
    }

    /// `max(abs, |reference| * ratio)`. A zero reference leaves only `abs`.
    pub fn threshold(&self, reference: f64) -> f64 {
        self.abs.max(reference.abs() * self.ratio)
    }

    /// True when `|test - reference|` is strictly above the threshold.
    pub fn exceeded(&self, reference: f64, test: f64) -> bool {
        (test - reference).abs() > self.threshold(reference)
    }
}

// ---------------------------------------------------------------------------
// Standard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemToleranceOverride {
    pub item: String,
    pub abs_tolerance: f64,
    pub ratio_tolerance: f64,
}

impl ItemToleranceOverride {
    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.abs_tolerance, self.ratio_tolerance)
    }
}

/// A named tolerance/allowance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceStandard {
    pub name: String,
    #[serde(default)]
    pub default_abs_tolerance: f64,
    #[serde(default)]
    pub default_ratio_tolerance: f64,
    #[serde(default)]
    pub allowed_ok_ng_mismatch: u32,
    #[serde(default)]
    pub allowed_defect_mismatch: u32,
    #[serde(default)]
    pub allowed_extent_mismatch: u32,
    /// Unique per item (case-insensitive), sorted by item.
    #[serde(default)]
    item_overrides: Vec<ItemToleranceOverride>,
}

impl AcceptanceStandard {
    /// A standard with zero tolerances and zero allowances.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_abs_tolerance: 0.0,
            default_ratio_tolerance: 0.0,
            allowed_ok_ng_mismatch: 0,
            allowed_defect_mismatch: 0,
            allowed_extent_mismatch: 0,
            item_overrides: Vec::new(),
        }
    }

    pub fn with_tolerance(mut self, abs: f64, ratio: f64) -> Self {
        self.default_abs_tolerance = abs;
        self.default_ratio_tolerance = ratio;
        self
    }

    pub fn with_allowances(mut self, ok_ng: u32, defect: u32, extent: u32) -> Self {
        self.allowed_ok_ng_mismatch = ok_ng;
        self.allowed_defect_mismatch = defect;
        self.allowed_extent_mismatch = extent;
        self
    }

    pub fn is_default(&self) -> bool {
        is_default_name(&self.name)
    }

    pub fn default_tolerance(&self) -> Tolerance {
        Tolerance::new(self.default_abs_tolerance, self.default_ratio_tolerance)
    }

    /// Override for `item` if one exists, else the standard's defaults.
    pub fn tolerance_for(&self, item: &str) -> Tolerance {
        let item = item.trim();
        self.item_overrides
            .iter()
            .find(|o| o.item.to_lowercase() == item.to_lowercase())
            .map(ItemToleranceOverride::tolerance)
            .unwrap_or_else(|| self.default_tolerance())
    }

    pub fn overrides(&self) -> &[ItemToleranceOverride] {
        &self.item_overrides
    }

    /// Insert or replace the override for `item`. Tolerances are clamped to >= 0.
    pub fn set_override(&mut self, item: &str, abs: f64, ratio: f64) {
        let item = item.trim();
        let tolerance = Tolerance::new(abs, ratio);
        self.item_overrides
            .retain(|o| o.item.to_lowercase() != item.to_lowercase());
        self.item_overrides.push(ItemToleranceOverride {
            item: item.to_string(),
            abs_tolerance: tolerance.abs,
            ratio_tolerance: tolerance.ratio,
        });
        sort_overrides(&mut self.item_overrides);
    }

    pub fn remove_override(&mut self, item: &str) -> bool {
        let item = item.trim().to_lowercase();
        let before = self.item_overrides.len();
        self.item_overrides.retain(|o| o.item.to_lowercase() != item);
        self.item_overrides.len() != before
    }

    /// Re-establish override invariants after deserialization: blank items
    /// dropped, duplicates resolved last-wins, tolerances clamped, sorted.
    pub fn normalize(&mut self) {
        let raw = std::mem::take(&mut self.item_overrides);
        for o in raw {
            if o.item.trim().is_empty() {
                continue;
            }
            self.set_override(&o.item, o.abs_tolerance, o.ratio_tolerance);
        }
        self.name = self.name.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidStandardMutation(
                "standard name must not be blank".into(),
            ));
        }
        for (label, value) in [
            ("default_abs_tolerance", self.default_abs_tolerance),
            ("default_ratio_tolerance", self.default_ratio_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidStandardMutation(format!(
                    "standard '{}': {label} must be a finite value >= 0, got {value}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

fn sort_overrides(overrides: &mut [ItemToleranceOverride]) {
    overrides.sort_by(|a, b| {
        a.item
            .to_lowercase()
            .cmp(&b.item.to_lowercase())
            .then_with(|| a.item.cmp(&b.item))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_max_of_abs_and_proportional() {
        let tol = Tolerance::new(1.0, 0.5);
        assert_eq!(tol.threshold(1.0), 1.0);
        assert_eq!(tol.threshold(-10.0), 5.0);
        assert_eq!(tol.threshold(0.0), 1.0);
    }

    #[test]
    fn exceeded_is_strict() {
        let tol = Tolerance::new(0.5, 0.0);
        assert!(!tol.exceeded(10.0, 10.5));
        assert!(tol.exceeded(10.0, 10.5001));
        assert!(tol.exceeded(10.0, 9.4));
    }

    #[test]
    fn negative_tolerances_clamp_to_zero() {
        let tol = Tolerance::new(-1.0, f64::NAN);
        assert_eq!(tol, Tolerance { abs: 0.0, ratio: 0.0 });
    }

    #[test]
    fn override_beats_defaults() {
        let mut standard = AcceptanceStandard::new("line-3").with_tolerance(0.1, 0.0);
        standard.set_override("Temp", 2.0, 0.01);
        assert_eq!(standard.tolerance_for("TEMP"), Tolerance::new(2.0, 0.01));
        assert_eq!(standard.tolerance_for("width"), Tolerance::new(0.1, 0.0));
    }

    #[test]
    fn overrides_unique_last_wins_and_sorted() {
        let mut standard = AcceptanceStandard::new("s");
        standard.set_override("width", 1.0, 0.0);
        standard.set_override("Area", 1.0, 0.0);
        standard.set_override("WIDTH", 3.0, -0.5);
        let items: Vec<&str> = standard.overrides().iter().map(|o| o.item.as_str()).collect();
        assert_eq!(items, vec!["Area", "WIDTH"]);
        assert_eq!(standard.tolerance_for("width"), Tolerance::new(3.0, 0.0));
    }

    #[test]
    fn normalize_dedups_deserialized_overrides() {
        let json = r#"{
            "name": " s ",
            "item_overrides": [
                {"item": "b", "abs_tolerance": 1.0, "ratio_tolerance": 0.0},
                {"item": "a", "abs_tolerance": 1.0, "ratio_tolerance": -2.0},
                {"item": "B", "abs_tolerance": 5.0, "ratio_tolerance": 0.0},
                {"item": "  ", "abs_tolerance": 5.0, "ratio_tolerance": 0.0}
            ]
        }"#;
        let mut standard: AcceptanceStandard = serde_json::from_str(json).unwrap();
        standard.normalize();
        assert_eq!(standard.name, "s");
        assert_eq!(standard.overrides().len(), 2);
        assert_eq!(standard.overrides()[0].ratio_tolerance, 0.0);
        assert_eq!(standard.tolerance_for("b").abs, 5.0);
    }

    #[test]
    fn remove_override_reports_change() {
        let mut standard = AcceptanceStandard::new("s");
        standard.set_override("a", 1.0, 0.0);
        assert!(standard.remove_override("A"));
        assert!(!standard.remove_override("A"));
    }

    #[test]
    fn validate_rejects_negative_defaults() {
        let standard = AcceptanceStandard::new("s").with_tolerance(-0.1, 0.0);
        assert!(matches!(standard.validate(), Err(ConfigError::InvalidStandardMutation(_))));
        assert!(AcceptanceStandard::new("  ").validate().is_err());
    }
}

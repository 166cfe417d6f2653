// Acceptance standard store
// Loaded from ~/.config/inspecta/standards.json (or an explicit path)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::standard::{is_default_name, AcceptanceStandard, DEFAULT_STANDARD};

fn default_ignored_items() -> Vec<String> {
    vec!["timestamp".to_string()]
}

/// Named standards, per-scope active bindings, and the item ignore-set.
///
/// Invariants: the `default` standard always exists; names are unique
/// case-insensitively; standards are kept sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardStore {
    /// Item columns excluded from row and extent comparison.
    #[serde(default = "default_ignored_items")]
    pub ignored_items: Vec<String>,

    /// Scope key (e.g. a recipe/template name) → active standard name.
    #[serde(default)]
    bindings: BTreeMap<String, String>,

    #[serde(default)]
    standards: Vec<AcceptanceStandard>,
}

impl Default for StandardStore {
    fn default() -> Self {
        Self {
            ignored_items: default_ignored_items(),
            bindings: BTreeMap::new(),
            standards: vec![AcceptanceStandard::new(DEFAULT_STANDARD)],
        }
    }
}

impl StandardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the standards file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inspecta")
            .join("standards.json")
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load from disk. A missing file yields a store holding only `default`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("{} not found, using built-in default standard", path.display());
            return Ok(Self::new());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut store: StandardStore =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        store.repair();
        Ok(store)
    }

    /// Save to disk (atomic: write `.tmp` then rename).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let persistence = |source: std::io::Error| ConfigError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(persistence)?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| persistence(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(persistence)?;
        fs::rename(&temp, path).map_err(persistence)?;

        log::debug!("saved {} standards to {}", self.standards.len(), path.display());
        Ok(())
    }

    /// Restore invariants on data that came from disk.
    fn repair(&mut self) {
        let raw = std::mem::take(&mut self.standards);
        for mut standard in raw {
            standard.normalize();
            if standard.name.is_empty() {
                log::warn!("dropping standard with blank name");
                continue;
            }
            if standard.is_default() {
                standard.name = DEFAULT_STANDARD.to_string();
            }
            self.put(standard);
        }
        if self.position(DEFAULT_STANDARD).is_none() {
            self.put(AcceptanceStandard::new(DEFAULT_STANDARD));
        }
        self.bindings.retain(|scope, name| {
            let known = !scope.trim().is_empty() && !name.trim().is_empty();
            if !known {
                log::warn!("dropping blank standard binding {scope:?} -> {name:?}");
            }
            known
        });
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        self.standards
            .iter()
            .position(|s| s.name.to_lowercase() == name)
    }

    /// Insert or replace by case-insensitive name, keeping the list sorted.
    fn put(&mut self, standard: AcceptanceStandard) {
        match self.position(&standard.name) {
            Some(i) => self.standards[i] = standard,
            None => self.standards.push(standard),
        }
        self.standards.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn list_standards(&self) -> &[AcceptanceStandard] {
        &self.standards
    }

    pub fn get(&self, name: &str) -> Option<&AcceptanceStandard> {
        self.position(name).map(|i| &self.standards[i])
    }

    /// Name of the standard bound to `scope`, falling back to `default`
    /// when the scope is unbound or bound to a name that no longer exists.
    pub fn active_name(&self, scope: &str) -> &str {
        match self.bindings.get(scope.trim()) {
            Some(name) => match self.get(name) {
                Some(standard) => &standard.name,
                None => {
                    log::warn!("scope '{scope}' is bound to unknown standard '{name}', using default");
                    DEFAULT_STANDARD
                }
            },
            None => DEFAULT_STANDARD,
        }
    }

    /// Snapshot of the active standard for `scope`.
    pub fn resolve_active(&self, scope: &str) -> AcceptanceStandard {
        let name = self.active_name(scope);
        self.get(name)
            .cloned()
            .unwrap_or_else(|| AcceptanceStandard::new(DEFAULT_STANDARD))
    }

    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Bind `scope` to an existing standard.
    pub fn bind(&mut self, scope: &str, name: &str) -> Result<(), ConfigError> {
        let scope = scope.trim();
        if scope.is_empty() {
            return Err(ConfigError::InvalidStandardMutation(
                "scope key must not be blank".into(),
            ));
        }
        let name = self
            .get(name)
            .map(|s| s.name.clone())
            .ok_or_else(|| ConfigError::UnknownStandard(name.to_string()))?;
        self.bindings.insert(scope.to_string(), name);
        Ok(())
    }

    pub fn unbind(&mut self, scope: &str) -> bool {
        self.bindings.remove(scope.trim()).is_some()
    }

    /// Insert a new standard or replace the one with the same name.
    pub fn upsert(&mut self, mut standard: AcceptanceStandard) -> Result<(), ConfigError> {
        standard.validate()?;
        standard.normalize();
        if standard.is_default() {
            standard.name = DEFAULT_STANDARD.to_string();
        } else if let Some(existing) = self.get(&standard.name) {
            // keep the stored spelling so bindings stay valid
            standard.name = existing.name.clone();
        }
        log::debug!("upsert standard '{}'", standard.name);
        self.put(standard);
        Ok(())
    }

    /// Rename a standard and move every binding that pointed at it.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), ConfigError> {
        let new = new.trim();
        if is_default_name(old) {
            return Err(ConfigError::InvalidStandardMutation(format!(
                "the '{DEFAULT_STANDARD}' standard cannot be renamed"
            )));
        }
        if new.is_empty() {
            return Err(ConfigError::InvalidStandardMutation(
                "standard name must not be blank".into(),
            ));
        }
        let index = self
            .position(old)
            .ok_or_else(|| ConfigError::UnknownStandard(old.to_string()))?;
        if let Some(other) = self.position(new) {
            if other != index {
                return Err(ConfigError::InvalidStandardMutation(format!(
                    "a standard named '{new}' already exists"
                )));
            }
        }

        let mut standard = self.standards.remove(index);
        let old_name = std::mem::replace(&mut standard.name, new.to_string());
        self.put(standard);

        for bound in self.bindings.values_mut() {
            if bound.to_lowercase() == old_name.to_lowercase() {
                *bound = new.to_string();
            }
        }
        log::info!("renamed standard '{old_name}' to '{new}'");
        Ok(())
    }

    /// Delete a standard; scopes bound to it fall back to `default`.
    pub fn delete(&mut self, name: &str) -> Result<AcceptanceStandard, ConfigError> {
        if is_default_name(name) {
            return Err(ConfigError::InvalidStandardMutation(format!(
                "the '{DEFAULT_STANDARD}' standard cannot be deleted"
            )));
        }
        let index = self
            .position(name)
            .ok_or_else(|| ConfigError::UnknownStandard(name.to_string()))?;
        let removed = self.standards.remove(index);

        for bound in self.bindings.values_mut() {
            if bound.to_lowercase() == removed.name.to_lowercase() {
                *bound = DEFAULT_STANDARD.to_string();
            }
        }
        log::info!("deleted standard '{}'", removed.name);
        Ok(removed)
    }
}

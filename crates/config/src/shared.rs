use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ConfigError;
use crate::standard::AcceptanceStandard;
use crate::store::StandardStore;

/// Cloneable handle to a store shared between a configuration editor and
/// comparison runs. Comparisons take value snapshots, so an edit landing
/// mid-run never changes the standard that run is using.
#[derive(Debug, Clone, Default)]
pub struct SharedStandardStore {
    inner: Arc<RwLock<StandardStore>>,
}

impl SharedStandardStore {
    pub fn new(store: StandardStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StandardStore> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StandardStore> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the active standard for `scope`.
    pub fn snapshot(&self, scope: &str) -> AcceptanceStandard {
        self.read().resolve_active(scope)
    }

    /// Snapshot of the whole store (e.g. for saving).
    pub fn store(&self) -> StandardStore {
        self.read().clone()
    }

    /// Apply a mutation under the write lock. The edit runs on a copy that
    /// replaces the store only when the whole closure succeeds.
    pub fn update<R>(
        &self,
        edit: impl FnOnce(&mut StandardStore) -> Result<R, ConfigError>,
    ) -> Result<R, ConfigError> {
        let mut guard = self.write();
        let mut draft = guard.clone();
        let out = edit(&mut draft)?;
        *guard = draft;
        Ok(out)
    }
}

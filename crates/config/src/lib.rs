// Acceptance standards: tolerance policies and the store that persists them
// Stored in ~/.config/inspecta/standards.json

pub mod error;
pub mod shared;
pub mod standard;
pub mod store;

pub use error::ConfigError;
pub use shared::SharedStandardStore;
pub use standard::{AcceptanceStandard, ItemToleranceOverride, Tolerance, DEFAULT_STANDARD};
pub use store::StandardStore;

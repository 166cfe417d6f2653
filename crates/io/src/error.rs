use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// The table file does not exist (distinct from an empty table).
    #[error("measurement table not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// A required identity column is absent from the header.
    #[error("{origin}: missing required column '{column}'")]
    MissingColumn { origin: String, column: String },

    /// The header row itself cannot be parsed.
    #[error("{origin}: cannot parse header: {message}")]
    Header { origin: String, message: String },

    /// An item name that the header cannot carry: blank, or spelled like an
    /// identity column.
    #[error("item name {item:?} is blank or collides with an identity column")]
    ReservedItemName { item: String },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a table failed. Never swallowed.
    #[error("cannot write {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

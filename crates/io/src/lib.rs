//! `inspecta-io` - measurement tables and their CSV codec.
//!
//! A measurement table is one capture run: a row per sample with identity
//! columns and a dynamic set of measured item columns. Values stay as text
//! here; numeric interpretation belongs to the comparator.

pub mod codec;
pub mod error;
pub mod model;
pub mod table;

pub use codec::{
    check_item_name, read_table, read_table_from, read_table_from_str, write_table, write_table_to,
    ReadOutcome, SkippedRow,
};
pub use error::IoError;
pub use model::{DetectionResult, ItemValues, Measurement, MeasurementRow, SampleKey};
pub use table::MeasurementTable;

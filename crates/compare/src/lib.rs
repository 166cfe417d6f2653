//! `inspecta-compare` - acceptance comparison engine.
//!
//! Pure engine crate: receives a reference table, a test table and a
//! standard snapshot, returns a report with a pass/fail verdict. Table
//! and config loading go through `inspecta-io` / `inspecta-config`.

pub mod capture;
pub mod engine;
pub mod error;
pub mod extent;
pub mod model;
pub mod numeric;
pub mod report;
pub mod rows;
pub mod verdict;

pub use capture::{
    capture, CancelToken, CapturePlan, CaptureSummary, DetectionPipeline, PipelineError, ReplayPipeline,
    SampleId,
};
pub use engine::{compare_files, compare_tables, compare_with_store, CompareOutcome, CompareRequest, StandardSelection};
pub use error::CompareError;
pub use model::{CompareOptions, CompareReport, MAX_LISTED};
pub use report::render_report;

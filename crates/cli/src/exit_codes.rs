//! CLI Exit Code Registry
//!
//! Single source of truth for `inspecta` exit codes. Station scripts branch
//! on these, so existing values never change meaning.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                  |
//! |---------|------------|----------------------------------------------|
//! | 0       | Universal  | Success (comparison: PASS)                   |
//! | 1       | Universal  | General error (unspecified)                  |
//! | 2       | Universal  | CLI usage error (bad args)                   |
//! | 3-9     | compare    | Verdict and missing-table codes              |
//! | 10-19   | standards  | Standards file and mutation codes            |
//! | 20-29   | table      | Measurement table I/O codes                  |
//! | 30-39   | capture    | Capture workflow codes                       |

use inspecta_compare::CompareError;
use inspecta_config::ConfigError;
use inspecta_io::IoError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed; for `compare`, the verdict was PASS.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input named on the command line.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Compare (3-9)
// =============================================================================

/// The comparison ran and the verdict was FAIL.
pub const EXIT_COMPARE_FAIL: u8 = 3;

/// The reference (baseline) table does not exist yet.
pub const EXIT_COMPARE_MISSING_BASELINE: u8 = 4;

/// The test table does not exist.
pub const EXIT_COMPARE_MISSING_TEST: u8 = 5;

// =============================================================================
// Standards (10-19)
// =============================================================================

/// Standards file exists but cannot be read or parsed.
pub const EXIT_CONFIG_INVALID: u8 = 10;

/// A standard named on the command line does not exist.
pub const EXIT_CONFIG_UNKNOWN_STANDARD: u8 = 11;

/// The requested change was rejected (e.g. deleting `default`).
pub const EXIT_CONFIG_REJECTED: u8 = 12;

/// The standards file could not be written.
pub const EXIT_CONFIG_PERSIST: u8 = 13;

// =============================================================================
// Table (20-29)
// =============================================================================

/// A table could not be read or written.
pub const EXIT_TABLE_IO: u8 = 20;

/// A table header is unusable (missing identity column, unparseable).
pub const EXIT_TABLE_FORMAT: u8 = 21;

// =============================================================================
// Capture (30-39)
// =============================================================================

/// Capture was cancelled before the plan completed.
pub const EXIT_CAPTURE_CANCELLED: u8 = 30;

/// The detection pipeline failed for a sample.
pub const EXIT_CAPTURE_DETECTION: u8 = 31;

/// A recorded detection result could not be parsed.
pub const EXIT_CAPTURE_INPUT: u8 = 32;

// =============================================================================
// Error mapping
// =============================================================================

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::MissingFile { .. } | IoError::Read { .. } | IoError::Persistence { .. } => EXIT_TABLE_IO,
        IoError::MissingColumn { .. } | IoError::Header { .. } | IoError::ReservedItemName { .. } => {
            EXIT_TABLE_FORMAT
        }
    }
}

pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Read { .. } | ConfigError::Parse { .. } => EXIT_CONFIG_INVALID,
        ConfigError::UnknownStandard(_) => EXIT_CONFIG_UNKNOWN_STANDARD,
        ConfigError::InvalidStandardMutation(_) => EXIT_CONFIG_REJECTED,
        ConfigError::Persistence { .. } => EXIT_CONFIG_PERSIST,
    }
}

pub fn compare_exit_code(err: &CompareError) -> u8 {
    match err {
        CompareError::MissingBaselineFile { .. } => EXIT_COMPARE_MISSING_BASELINE,
        CompareError::MissingTestFile { .. } => EXIT_COMPARE_MISSING_TEST,
        CompareError::Table(e) => io_exit_code(e),
        CompareError::Config(e) => config_exit_code(e),
        CompareError::CaptureCancelled { .. } => EXIT_CAPTURE_CANCELLED,
        CompareError::Detection { .. } => EXIT_CAPTURE_DETECTION,
        CompareError::DetectionInput { .. } => EXIT_CAPTURE_INPUT,
    }
}

//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | import           | Sheet, config, store and commit codes    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use dyetrack_io::IoError;
use dyetrack_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, malformed --pick, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Import (3-9)
// =============================================================================

/// Dispatch sheet could not be opened or read.
pub const EXIT_SHEET: u8 = 3;

/// Import config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Order store could not be opened, read or written outside a commit.
pub const EXIT_STORE: u8 = 5;

/// Commit stopped at a failed write. Earlier rows stay committed.
pub const EXIT_COMMIT_FAILED: u8 = 6;

/// Map a store-side error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Open { .. } | IoError::NoSheets | IoError::Sheet { .. } => EXIT_SHEET,
        IoError::Xlsx(_) => EXIT_ERROR,
        IoError::Json(_) => EXIT_USAGE,
        IoError::Sqlite(_)
        | IoError::BatchNotFound(_)
        | IoError::OrderNotFound(_)
        | IoError::SchemaVersion { .. }
        | IoError::CorruptEvent { .. } => EXIT_STORE,
    }
}

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::LayoutValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::UnknownRecord(_) => EXIT_USAGE,
        ReconError::InvalidStep { .. } => EXIT_ERROR,
        ReconError::Store(_) => EXIT_STORE,
    }
}

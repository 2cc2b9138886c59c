//! CLI Exit Code Registry
//!
//! Single source of truth for `plens` exit codes. Exit codes are part of
//! the shell contract — scripts rely on them.
//!
//! | Code | Domain    | Description                                    |
//! |------|-----------|------------------------------------------------|
//! | 0    | Universal | Success                                        |
//! | 1    | Universal | General error (unspecified)                    |
//! | 2    | Universal | CLI usage error (bad args, bad filter values)  |
//! | 3    | Intake    | Cannot read or parse an input export           |
//! | 4    | Schema    | Required join-key column absent                |
//! | 5    | Config    | Column-mapping config invalid                  |
//!
//! When adding a code: add the constant, document what triggers it, update
//! the table, and wire it into the relevant command's error handling.

use prooflens_engine::PipelineError;
use prooflens_io::IoError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid filter values.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read or parse an input CSV export.
pub const EXIT_PARSE: u8 = 3;

/// A required join-key column is missing from an input export.
pub const EXIT_SCHEMA: u8 = 4;

/// The column-mapping config failed to parse or validate.
pub const EXIT_CONFIG: u8 = 5;

/// Map an engine error to its exit code.
pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::Parse(_) => EXIT_PARSE,
        PipelineError::MissingJoinKey { .. } => EXIT_SCHEMA,
        PipelineError::ConfigParse(_) | PipelineError::ConfigValidation(_) => EXIT_CONFIG,
        PipelineError::InvalidFilter(_) => EXIT_USAGE,
    }
}

/// Map an io error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Read(_) | IoError::Parse(_) => EXIT_PARSE,
        IoError::Write(_) => EXIT_ERROR,
    }
}

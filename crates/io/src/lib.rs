//! `prooflens-io` — file intake and export for the analysis pipeline.
//!
//! Reads the two delimited exports into raw tables (UTF-8 with a Shift_JIS
//! fallback, delimiter sniffing) and writes the filtered joined view as
//! BOM-prefixed UTF-8 CSV for spreadsheet applications.

pub mod csv;
pub mod error;

pub use csv::{read_table, write_filtered_csv, EXPORT_FILE_NAME};
pub use error::IoError;

//! I/O error types for oligoboost-io.

use std::path::PathBuf;

/// Errors from reading sequence tables and writing predictions.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a required column is absent from the header.
    #[error("missing required column \"{column}\" in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Name of the missing column.
        column: &'static str,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a row has an empty `ID` cell.
    #[error("empty ID in {path} at row {row_index}")]
    EmptyId {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
    },

    /// Returned when a row has an empty `Sequence` cell.
    #[error("empty sequence in {path} at row {row_index} (ID {id})")]
    EmptySequence {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// ID of the offending row.
        id: String,
    },

    /// Returned when a `Label` cell is anything other than `0` or `1`.
    #[error("invalid label \"{raw}\" in {path} at row {row_index} (ID {id}): expected 0 or 1")]
    InvalidLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// ID of the offending row.
        id: String,
        /// The raw cell value.
        raw: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the output file cannot be created or flushed.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV writer fails to serialize a record.
    #[error("CSV write error in {path}")]
    CsvWrite {
        /// Path being written.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the number of IDs and probabilities differ.
    #[error("cannot pair {ids} IDs with {probabilities} probabilities")]
    LengthMismatch {
        /// Number of IDs supplied.
        ids: usize,
        /// Number of probabilities supplied.
        probabilities: usize,
    },
}

//! Error types for feature assembly and standardization.

/// Errors from building or standardizing feature matrices.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Returned when a matrix with zero rows is built or used to fit a scaler.
    #[error("feature matrix must have at least one row")]
    EmptyMatrix,

    /// Returned when rows of a matrix have different widths.
    #[error("row {row_index} has {got} columns, expected {expected}")]
    RaggedRows {
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
        /// Zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when a matrix contains NaN or an infinite value.
    #[error("non-finite value at row {row_index}, column {col_index}")]
    NonFiniteValue {
        /// Zero-based row index.
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
    },

    /// Returned when a scaler is applied to a matrix of a different width.
    #[error("scaler was fit on {expected} columns, got a matrix with {got}")]
    WidthMismatch {
        /// Width seen at fit time.
        expected: usize,
        /// Width of the matrix being transformed.
        got: usize,
    },
}

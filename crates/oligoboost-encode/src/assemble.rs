//! Feature matrix assembly: one-hot blocks followed by the raw sequence length.

use tracing::{debug, instrument};

use crate::error::EncodeError;
use crate::onehot::OneHotEncoder;

/// Owned, validated row-major feature matrix.
///
/// Guaranteed to have at least one row, every row the same width, and every
/// value finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
    width: usize,
}

impl FeatureMatrix {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EncodeError::EmptyMatrix`] | `rows` is empty |
    /// | [`EncodeError::RaggedRows`] | Rows have different widths |
    /// | [`EncodeError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, EncodeError> {
        let width = rows.first().ok_or(EncodeError::EmptyMatrix)?.len();
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(EncodeError::RaggedRows {
                    expected: width,
                    got: row.len(),
                    row_index,
                });
            }
            if let Some(col_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(EncodeError::NonFiniteValue {
                    row_index,
                    col_index,
                });
            }
        }
        Ok(Self { rows, width })
    }

    /// Build without validation. Callers guarantee the invariants.
    pub(crate) fn new_unchecked(rows: Vec<Vec<f64>>, width: usize) -> Self {
        Self { rows, width }
    }

    /// Borrow the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Consume and return the rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }
}

/// Builds `max_length * 4 + 1` wide rows: the one-hot encoding of a sequence
/// followed by its native (unpadded) length.
#[derive(Debug, Clone, Copy)]
pub struct FeatureAssembler {
    encoder: OneHotEncoder,
}

impl FeatureAssembler {
    /// Create an assembler for sequences padded or truncated to `max_length`.
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self {
            encoder: OneHotEncoder::new(max_length),
        }
    }

    /// Return the width of every assembled row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.encoder.width() + 1
    }

    /// Return the underlying one-hot encoder.
    #[must_use]
    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Assemble the feature matrix for `sequences`, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::EmptyMatrix`] when `sequences` is empty.
    #[instrument(skip_all, fields(n = sequences.len(), width = self.width()))]
    pub fn assemble<S: AsRef<str>>(&self, sequences: &[S]) -> Result<FeatureMatrix, EncodeError> {
        if sequences.is_empty() {
            return Err(EncodeError::EmptyMatrix);
        }
        let rows: Vec<Vec<f64>> = sequences
            .iter()
            .map(|s| {
                let s = s.as_ref();
                let mut row = self.encoder.encode(s);
                row.push(s.chars().count() as f64);
                row
            })
            .collect();
        debug!("feature matrix assembled");
        Ok(FeatureMatrix::new_unchecked(rows, self.width()))
    }
}

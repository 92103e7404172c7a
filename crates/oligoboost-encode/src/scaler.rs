//! Per-column standardization to zero mean and unit variance.

use tracing::{debug, instrument};

use crate::assemble::FeatureMatrix;
use crate::error::EncodeError;

/// Standard deviations at or below this are treated as zero.
const ZERO_SCALE_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// Per-column affine standardization learned from one matrix.
///
/// Uses population standard deviation (divides by n, not n-1). Columns with
/// zero variance get a scale of 1.0 and so map to 0.0 after centering.
///
/// Fit on the training partition only; [`transform`](Self::transform) then
/// applies the same parameters to any matrix of the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Learn column means and scales from `matrix`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::EmptyMatrix`] if `matrix` has no columns.
    #[instrument(skip_all, fields(n_rows = matrix.n_rows(), width = matrix.width()))]
    pub fn fit(matrix: &FeatureMatrix) -> Result<Self, EncodeError> {
        let width = matrix.width();
        if width == 0 {
            return Err(EncodeError::EmptyMatrix);
        }
        let n = matrix.n_rows() as f64;

        let mut means = vec![0.0f64; width];
        for row in matrix.rows() {
            for (m, &x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut variances = vec![0.0f64; width];
        for row in matrix.rows() {
            for ((v, &x), &m) in variances.iter_mut().zip(row).zip(&means) {
                *v += (x - m).powi(2);
            }
        }

        let mut n_constant = 0usize;
        let scales: Vec<f64> = variances
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std <= ZERO_SCALE_TOLERANCE {
                    n_constant += 1;
                    1.0
                } else {
                    std
                }
            })
            .collect();
        debug!(n_constant, "scaler fitted");

        Ok(Self { means, scales })
    }

    /// Apply the learned transform to `matrix`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::WidthMismatch`] if `matrix` has a different
    /// width than the matrix the scaler was fit on.
    pub fn transform(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix, EncodeError> {
        if matrix.width() != self.means.len() {
            return Err(EncodeError::WidthMismatch {
                expected: self.means.len(),
                got: matrix.width(),
            });
        }
        let rows: Vec<Vec<f64>> = matrix
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.means)
                    .zip(&self.scales)
                    .map(|((&x, &m), &s)| (x - m) / s)
                    .collect()
            })
            .collect();
        Ok(FeatureMatrix::new_unchecked(rows, matrix.width()))
    }

    /// Fit on `matrix` and return it transformed.
    ///
    /// # Errors
    ///
    /// Same as [`fit`](Self::fit).
    pub fn fit_transform(matrix: &FeatureMatrix) -> Result<(Self, FeatureMatrix), EncodeError> {
        let scaler = Self::fit(matrix)?;
        let transformed = scaler.transform(matrix)?;
        Ok((scaler, transformed))
    }

    /// Return the learned column means.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Return the learned column scales (standard deviations, 1.0 for constant columns).
    #[must_use]
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

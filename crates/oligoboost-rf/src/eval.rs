//! Stratified k-fold cross-validation scored by ROC-AUC.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::metrics::roc_auc;
use crate::tree::validate_dataset;

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Per-fold and aggregate scores of one cross-validated configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CvScore {
    /// ROC-AUC on each held-out fold, in fold order.
    pub fold_scores: Vec<f64>,
    /// Mean of `fold_scores`.
    pub mean: f64,
    /// Population standard deviation of `fold_scores`.
    pub std: f64,
}

impl CvScore {
    pub(crate) fn from_folds(fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len() as f64;
        let mean = fold_scores.iter().sum::<f64>() / n;
        let variance = fold_scores.iter().map(|&s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            fold_scores,
            mean,
            std: variance.sqrt(),
        }
    }
}

/// Largest usable stratified fold count not above `requested`.
///
/// This is the size of the smallest class present in `labels`, capped at
/// `requested`. Returns `None` when fewer than 2 folds are possible.
#[must_use]
pub fn feasible_fold_count(labels: &[usize], requested: usize) -> Option<usize> {
    let n_classes = labels.iter().max().copied()? + 1;
    let mut counts = vec![0usize; n_classes];
    for &label in labels {
        counts[label] += 1;
    }
    let smallest = counts.into_iter().filter(|&c| c > 0).min()?;
    let n_folds = smallest.min(requested);
    (n_folds >= 2).then_some(n_folds)
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the fold shuffling seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train and score `config` on each fold, returning per-fold ROC-AUC.
    ///
    /// Each fold trains a forest on the remaining folds (seeded with
    /// `config.seed() + fold`) and scores the positive-class probabilities of
    /// the held-out fold.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero samples |
    /// | [`RfError::TooFewSamplesForFolds`] | A class has fewer samples than folds |
    /// | [`RfError::UndefinedAuc`] | A held-out fold contains a single class |
    /// | Other RF errors | From underlying training |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = features.len()))]
    pub fn score_auc(
        &self,
        config: &RandomForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<CvScore, RfError> {
        validate_dataset(features, labels)?;
        let fold_assignments = self.stratified_folds(labels)?;

        let mut fold_scores = Vec::with_capacity(self.n_folds);
        for fold in 0..self.n_folds {
            let mut train_features = Vec::new();
            let mut train_labels = Vec::new();
            let mut test_features = Vec::new();
            let mut test_labels = Vec::new();

            for (i, &assigned_fold) in fold_assignments.iter().enumerate() {
                if assigned_fold == fold {
                    test_features.push(features[i].clone());
                    test_labels.push(labels[i]);
                } else {
                    train_features.push(features[i].clone());
                    train_labels.push(labels[i]);
                }
            }

            // Each fold trains with different randomness.
            let fold_config = config.clone().with_seed(config.seed.wrapping_add(fold as u64));
            let forest = fold_config.fit(&train_features, &train_labels)?.into_forest();

            let scores = forest.positive_proba_batch(&test_features)?;
            let auc = roc_auc(&test_labels, &scores)?;
            debug!(fold, auc, "fold completed");
            fold_scores.push(auc);
        }

        Ok(CvScore::from_folds(fold_scores))
    }

    /// Assign each sample to a fold, preserving class proportions.
    ///
    /// Groups samples by class, shuffles within each class, then
    /// round-robins across folds so each fold gets approximately
    /// equal representation of each class.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::TooFewSamplesForFolds`] when a class present in
    /// `labels` has fewer samples than folds.
    pub fn stratified_folds(&self, labels: &[usize]) -> Result<Vec<usize>, RfError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;

        let mut class_indices: Vec<Vec<usize>> = vec![vec![]; n_classes];
        for (i, &label) in labels.iter().enumerate() {
            class_indices[label].push(i);
        }

        for (class, indices) in class_indices.iter().enumerate() {
            if !indices.is_empty() && indices.len() < self.n_folds {
                return Err(RfError::TooFewSamplesForFolds {
                    class,
                    count: indices.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut fold_assignments = vec![0usize; labels.len()];
        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            for (j, &idx) in indices.iter().enumerate() {
                fold_assignments[idx] = j % self.n_folds;
            }
        }

        Ok(fold_assignments)
    }
}

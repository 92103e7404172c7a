//! Training result types for Random Forest.

use crate::forest::RandomForest;

/// Metadata about the training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    /// Number of trees trained.
    pub n_trees: usize,
    /// Number of features in the dataset.
    pub n_features: usize,
    /// Number of distinct classes.
    pub n_classes: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Resolved max_features value used.
    pub max_features_resolved: usize,
}

/// Result of Random Forest training: the fitted forest and training metadata.
#[derive(Debug, Clone)]
pub struct RandomForestResult {
    forest: RandomForest,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(forest: RandomForest, metadata: TrainingMetadata) -> Self {
        Self { forest, metadata }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}

/// Errors from Random Forest, cross-validation, grid search and boosting.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The invalid bootstrap_fraction value provided.
        fraction: f64,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when the number of boosting rounds is zero.
    #[error("n_rounds must be at least 1, got {n_rounds}")]
    InvalidRoundCount {
        /// The invalid n_rounds value provided.
        n_rounds: usize,
    },

    /// Returned when the boosting learning rate is not a positive finite number.
    #[error("learning_rate must be positive and finite, got {learning_rate}")]
    InvalidLearningRate {
        /// The invalid learning rate.
        learning_rate: f64,
    },

    /// Returned when sample weights are negative, non-finite, sum to zero, or
    /// do not match the number of samples.
    #[error("invalid sample weights: {reason}")]
    InvalidSampleWeights {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when a hyperparameter grid has no candidates.
    #[error("parameter grid has no candidates: `{parameter}` has no values")]
    EmptyGrid {
        /// Name of the parameter with an empty value list.
        parameter: &'static str,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the number of labels (or scores) differs from the number of samples.
    #[error("got {labels} labels for {samples} samples")]
    LabelCountMismatch {
        /// Number of samples.
        samples: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a class has fewer samples than the number of folds.
    #[error("class {class} has only {count} samples, need at least {n_folds} for stratified CV")]
    TooFewSamplesForFolds {
        /// The class label with insufficient samples.
        class: usize,
        /// The number of samples belonging to that class.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when ROC-AUC is requested for labels containing a single class.
    #[error("ROC-AUC is undefined: {n_positive} positive and {n_negative} negative samples")]
    UndefinedAuc {
        /// Number of positive-class samples.
        n_positive: usize,
        /// Number of negative-class samples.
        n_negative: usize,
    },

    /// Returned when boosting cannot produce a single usable estimator.
    #[error("boosting failed: {reason}")]
    BoostingFailed {
        /// Human-readable description of why boosting failed.
        reason: String,
    },
}

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{Node, NodeIndex},
    split::{SplitCriterion, WeightedColumns, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until all leaves are pure or stopping conditions
    /// are met. `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the maximum number of features to consider at each split.
    ///
    /// `None` means consider all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Train a decision tree with uniform sample weights.
    ///
    /// See [`fit_weighted`](Self::fit_weighted).
    ///
    /// # Errors
    ///
    /// Same as [`fit_weighted`](Self::fit_weighted).
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        self.fit_weighted(features, labels, &vec![1.0; features.len()])
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]` is row-major, `labels[sample_idx]`
    /// is a zero-based class label and `weights[sample_idx]` its sample weight.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | `features` is empty |
    /// | [`RfError::ZeroFeatures`] | rows have zero feature columns |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`RfError::LabelCountMismatch`] | `labels.len() != features.len()` |
    /// | [`RfError::NonFiniteValue`] | any value is NaN or infinite |
    /// | [`RfError::InvalidSampleWeights`] | weights are negative, non-finite, all zero or miscounted |
    /// | [`RfError::InvalidMaxFeatures`] | `max_features` resolves outside [1, n_features] |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`RfError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1 |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit_weighted(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        weights: &[f64],
    ) -> Result<DecisionTree, RfError> {
        let n_features = validate_dataset(features, labels)?;
        validate_weights(weights, features.len())?;
        validate_growth(self.max_depth, self.min_samples_split, self.min_samples_leaf)?;

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let columns = to_columns(features, n_features);
        let data = WeightedColumns {
            columns: &columns,
            labels,
            weights,
            n_classes,
        };
        let sample_indices: Vec<usize> = (0..features.len()).collect();
        Ok(self.grow(&data, &sample_indices, max_features))
    }

    /// Grow a tree over pre-validated column-major data.
    ///
    /// Only `sample_indices` take part; every other sample is ignored.
    pub(crate) fn grow(
        &self,
        data: &WeightedColumns<'_>,
        sample_indices: &[usize],
        max_features: usize,
    ) -> DecisionTree {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();
        build_tree(data, sample_indices, self, 0, &mut rng, &mut arena, max_features);

        debug!(
            n_samples = sample_indices.len(),
            n_nodes = arena.len(),
            "decision tree built"
        );

        DecisionTree {
            nodes: arena,
            n_features: data.columns.len(),
            n_classes: data.n_classes,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a row-major dataset and return its feature count.
pub(crate) fn validate_dataset(features: &[Vec<f64>], labels: &[usize]) -> Result<usize, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            samples: features.len(),
            labels: labels.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Check that sample weights are usable for training.
pub(crate) fn validate_weights(weights: &[f64], n_samples: usize) -> Result<(), RfError> {
    if weights.len() != n_samples {
        return Err(RfError::InvalidSampleWeights {
            reason: format!("got {} weights for {n_samples} samples", weights.len()),
        });
    }
    if let Some(i) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
        return Err(RfError::InvalidSampleWeights {
            reason: format!("weight {} at sample {i} is negative or non-finite", weights[i]),
        });
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(RfError::InvalidSampleWeights {
            reason: "weights sum to zero".to_string(),
        });
    }
    Ok(())
}

/// Check the tree-growth limits shared by trees and forests.
pub(crate) fn validate_growth(
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
) -> Result<(), RfError> {
    if max_depth == Some(0) {
        return Err(RfError::InvalidMaxDepth { max_depth: 0 });
    }
    if min_samples_split < 2 {
        return Err(RfError::InvalidMinSamplesSplit { min_samples_split });
    }
    if min_samples_leaf < 1 {
        return Err(RfError::InvalidMinSamplesLeaf { min_samples_leaf });
    }
    Ok(())
}

/// Transpose row-major features into columns.
pub(crate) fn to_columns(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
        .collect()
}

/// Index of the largest value, lowest index on ties.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Recursively build the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn build_tree(
    data: &WeightedColumns<'_>,
    sample_indices: &[usize],
    config: &DecisionTreeConfig,
    depth: usize,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<Node>,
    max_features: usize,
) -> NodeIndex {
    let n_samples = sample_indices.len();
    let (class_weights, weight) = data.class_weights(sample_indices);
    let impurity = config.criterion.impurity(&class_weights, weight);

    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let distribution: Vec<f64> = if weight > 0.0 {
            class_weights.iter().map(|&w| w / weight).collect()
        } else {
            // Every sample here has zero weight: fall back to plain counts.
            let mut counts = vec![0.0; data.n_classes];
            for &si in sample_indices {
                counts[data.labels[si]] += 1.0;
            }
            counts.iter().map(|c| c / n_samples as f64).collect()
        };
        let idx = arena.len();
        arena.push(Node::Leaf {
            prediction: argmax(&distribution),
            distribution,
            impurity,
            n_samples,
            weight,
        });
        NodeIndex::new(idx)
    };

    let depth_exceeded = config.max_depth.is_some_and(|max_d| depth >= max_d);
    let too_few = n_samples < config.min_samples_split || n_samples < 2 * config.min_samples_leaf;
    let pure = impurity.value() <= f64::EPSILON;

    if too_few || pure || depth_exceeded {
        return make_leaf(arena);
    }

    let Some(split) = find_best_split(
        data,
        sample_indices,
        config.criterion,
        max_features,
        config.min_samples_leaf,
        rng,
    ) else {
        return make_leaf(arena);
    };

    // Reserve this node's slot so children get later indices, then overwrite.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: 0,
        distribution: Vec::new(),
        impurity,
        n_samples,
        weight,
    });

    let left = build_tree(data, &split.left_indices, config, depth + 1, rng, arena, max_features);
    let right = build_tree(data, &split.right_indices, config, depth + 1, rng, arena, max_features);

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        impurity,
        n_samples,
        weight,
    };

    NodeIndex::new(node_idx)
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root is
/// at index 0.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// Traverses from the root: at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        match self.leaf(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the class probability distribution for a single sample.
    ///
    /// The returned slice has length `n_classes` and sums to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], RfError> {
        match self.leaf(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Return the maximum depth of the tree. A single root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node_idx, d)) = stack.pop() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    fn leaf(&self, sample: &[f64]) -> Result<&Node, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                leaf @ Node::Leaf { .. } => return Ok(leaf),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        (features, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn empty_dataset_error() {
        let err = DecisionTreeConfig::new().fit(&[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let features = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let tree = DecisionTreeConfig::new().fit(&features, &[0, 0, 0]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&[2.0, 3.0]).unwrap(), 0);
    }

    #[test]
    fn linearly_separable_correct_split() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[11.0, 0.0]).unwrap(), 1);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn xor_needs_depth_at_least_2() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let tree = DecisionTreeConfig::new().fit(&features, &[0, 1, 1, 0]).unwrap();
        assert!(tree.depth() >= 2);
    }

    #[test]
    fn max_depth_limits_tree() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&features, &[0, 1, 1, 0])
            .unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn min_samples_split_stops_growth() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new()
            .with_min_samples_split(7)
            .fit(&features, &labels)
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.root().n_samples(), 6);
    }

    #[test]
    fn leaf_distribution_is_weighted() {
        // Identical features force a single leaf holding both classes.
        let features = vec![vec![1.0], vec![1.0], vec![1.0]];
        let tree = DecisionTreeConfig::new()
            .fit_weighted(&features, &[0, 1, 1], &[3.0, 0.5, 0.5])
            .unwrap();
        let proba = tree.predict_proba(&[1.0]).unwrap();
        assert!((proba[0] - 0.75).abs() < 1e-12);
        assert!((proba[1] - 0.25).abs() < 1e-12);
        assert_eq!(tree.predict(&[1.0]).unwrap(), 0);
        assert!((tree.root().weight() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn predict_proba_sums_to_one() {
        let (features, labels) = separable();
        let tree = DecisionTreeConfig::new().fit(&features, &labels).unwrap();
        let sum: f64 = tree.predict_proba(&[5.0, 0.0]).unwrap().iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
    }

    #[test]
    fn ties_predict_lowest_class() {
        let features = vec![vec![1.0], vec![1.0]];
        let tree = DecisionTreeConfig::new().fit(&features, &[0, 1]).unwrap();
        assert_eq!(tree.predict(&[1.0]).unwrap(), 0);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels) = separable();
        let config = DecisionTreeConfig::new().with_max_features(Some(1)).with_seed(123);
        let tree1 = config.fit(&features, &labels).unwrap();
        let tree2 = config.fit(&features, &labels).unwrap();
        for sample in &features {
            assert_eq!(tree1.predict(sample).unwrap(), tree2.predict(sample).unwrap());
        }
    }

    #[test]
    fn prediction_feature_mismatch() {
        let tree = DecisionTreeConfig::new()
            .fit(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[0, 1])
            .unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn feature_count_mismatch_error() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0, 2.0], vec![3.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(err, RfError::FeatureCountMismatch { .. }));
    }

    #[test]
    fn label_count_mismatch_error() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0], vec![3.0]], &[0])
            .unwrap_err();
        assert!(matches!(err, RfError::LabelCountMismatch { samples: 2, labels: 1 }));
    }

    #[test]
    fn non_finite_value_error() {
        let err = DecisionTreeConfig::new()
            .fit(&[vec![1.0, f64::NAN], vec![3.0, 4.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::NonFiniteValue { sample_index: 0, feature_index: 1 }
        ));
    }

    #[test]
    fn negative_weight_error() {
        let err = DecisionTreeConfig::new()
            .fit_weighted(&[vec![1.0], vec![2.0]], &[0, 1], &[1.0, -0.5])
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidSampleWeights { .. }));
    }

    #[test]
    fn invalid_growth_limits() {
        let data = [vec![1.0], vec![2.0]];
        let err = DecisionTreeConfig::new()
            .with_max_depth(Some(0))
            .fit(&data, &[0, 1])
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidMaxDepth { max_depth: 0 }));
        let err = DecisionTreeConfig::new()
            .with_min_samples_split(1)
            .fit(&data, &[0, 1])
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidMinSamplesSplit { min_samples_split: 1 }));
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
    }
}

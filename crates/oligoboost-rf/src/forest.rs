//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::RfError;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::split::WeightedColumns;
use crate::tree::{
    DecisionTree, DecisionTreeConfig, to_columns, validate_dataset, validate_growth,
    validate_weights,
};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Draw a bootstrap sample and turn it into per-sample weights.
///
/// Returns the in-bag sample indices and the weight vector
/// `draw_count[i] * weights[i]`. Samples whose combined weight is zero are
/// left out of the in-bag set unless that would leave it empty.
fn bootstrap_weights(
    weights: &[f64],
    draw_count: usize,
    rng: &mut impl Rng,
) -> (Vec<usize>, Vec<f64>) {
    let n_samples = weights.len();
    let mut counts = vec![0u32; n_samples];
    for _ in 0..draw_count {
        counts[rng.gen_range(0..n_samples)] += 1;
    }

    let tree_weights: Vec<f64> = counts
        .iter()
        .zip(weights)
        .map(|(&c, &w)| f64::from(c) * w)
        .collect();

    let mut in_bag: Vec<usize> = (0..n_samples).filter(|&i| tree_weights[i] > 0.0).collect();
    if in_bag.is_empty() {
        in_bag = (0..n_samples).filter(|&i| counts[i] > 0).collect();
    }
    (in_bag, tree_weights)
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    weights: &[f64],
) -> Result<RandomForestResult, RfError> {
    // --- Validate inputs ---
    let n_features = validate_dataset(features, labels)?;
    validate_weights(weights, features.len())?;
    let n_samples = features.len();

    // --- Validate config ---
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;
    validate_growth(
        config.max_depth,
        config.min_samples_split,
        config.min_samples_leaf,
    )?;

    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(RfError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }

    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    debug!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        draw_count,
        "training random forest"
    );

    // Transposed once, shared read-only by every tree.
    let columns = to_columns(features, n_features);

    // Generate per-tree seeds from master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let tree_config = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (in_bag, tree_weights) = bootstrap_weights(weights, draw_count, &mut rng);
            let data = WeightedColumns {
                columns: &columns,
                labels,
                weights: &tree_weights,
                n_classes,
            };
            tree_config
                .clone()
                .with_seed(rng.r#gen())
                .grow(&data, &in_bag, max_features_resolved)
        })
        .collect();

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved,
    };

    info!(
        n_trees = forest.trees.len(),
        max_depth = ?config.max_depth,
        min_samples_split = config.min_samples_split,
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, metadata))
}

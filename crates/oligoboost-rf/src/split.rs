use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its weighted class totals.
    ///
    /// `class_weights[c]` is the summed sample weight of class `c` and
    /// `total_weight` their sum. Returns [`Impurity::new(0.0)`] when
    /// `total_weight` is not positive.
    #[must_use]
    pub fn impurity(&self, class_weights: &[f64], total_weight: f64) -> Impurity {
        if total_weight <= 0.0 {
            return Impurity::new(0.0);
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_weights
                    .iter()
                    .map(|&w| {
                        let p = w / total_weight;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_weights
                    .iter()
                    .filter(|&&w| w > 0.0)
                    .map(|&w| {
                        let p = w / total_weight;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value.max(0.0))
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Weighted training view shared by every node of one tree.
///
/// `columns` is column-major: `columns[feature_idx][sample_idx]`.
/// `labels` and `weights` are indexed by the same sample index.
pub(crate) struct WeightedColumns<'a> {
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) weights: &'a [f64],
    pub(crate) n_classes: usize,
}

impl WeightedColumns<'_> {
    /// Sum sample weights per class over `sample_indices`.
    pub(crate) fn class_weights(&self, sample_indices: &[usize]) -> (Vec<f64>, f64) {
        let mut class_weights = vec![0.0f64; self.n_classes];
        let mut total = 0.0;
        for &si in sample_indices {
            class_weights[self.labels[si]] += self.weights[si];
            total += self.weights[si];
        }
        (class_weights, total)
    }
}

/// Find the best split among a random subset of features.
///
/// Features are drawn in random order. Each one that is not constant over
/// `sample_indices` has its values sorted and scanned left-to-right, moving
/// one sample's weight at a time from the right child to the left, keeping
/// the split with the largest weighted impurity decrease
/// `W·I - W_l·I_l - W_r·I_r`. Ties keep the first split found.
///
/// Constant features do not count toward `max_features`. Once
/// `max_features` non-constant features have been scanned the search stops,
/// unless no valid split has been found yet, in which case drawing continues
/// through the remaining features.
///
/// Returns `None` only when no feature admits a valid split (every feature
/// is constant, or every split would violate `min_samples_leaf`).
pub(crate) fn find_best_split(
    data: &WeightedColumns<'_>,
    sample_indices: &[usize],
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = data.columns.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let (parent_weights, parent_total) = data.class_weights(sample_indices);
    let parent_impurity = criterion.impurity(&parent_weights, parent_total);

    // Lazy Fisher-Yates: position `i` is fixed only when it is drawn.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.clamp(1, n_features);
    let mut n_scanned = 0usize;

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for i in 0..n_features {
        if n_scanned >= take && best.is_some() {
            break;
        }
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
        let feat_idx = feature_order[i];
        let feat_col = &data.columns[feat_idx];

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        if sorted[0].0 == sorted[n_samples - 1].0 {
            continue;
        }
        n_scanned += 1;

        let mut left_weights = vec![0.0f64; data.n_classes];
        let mut right_weights = parent_weights.clone();
        let mut left_total = 0.0f64;

        for k in 0..(n_samples - 1) {
            let (val_k, si) = sorted[k];
            let class_k = data.labels[si];
            let w = data.weights[si];

            left_weights[class_k] += w;
            right_weights[class_k] -= w;
            left_total += w;

            let val_next = sorted[k + 1].0;
            if val_k == val_next {
                continue;
            }

            let n_left = k + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let right_total = parent_total - left_total;
            let left_impurity = criterion.impurity(&left_weights, left_total);
            let right_impurity = criterion.impurity(&right_weights, right_total.max(0.0));

            let decrease = parent_total * parent_impurity.value()
                - left_total * left_impurity.value()
                - right_total * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), (val_k + val_next) / 2.0));
            }
        }
    }

    let (feature, threshold) = best?;

    let feat_col = &data.columns[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        left_indices,
        right_indices,
    })
}

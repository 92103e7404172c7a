//! Binary classification metrics.

use crate::error::RfError;

/// Area under the ROC curve for binary labels, treating class 1 as positive.
///
/// Computed as the normalized Mann-Whitney U statistic: scores are ranked
/// ascending, tied scores share their average rank, and
/// `AUC = (R_pos - n_pos(n_pos+1)/2) / (n_pos * n_neg)` where `R_pos` is the
/// rank sum of the positives. Any label other than 1 counts as negative.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`RfError::LabelCountMismatch`] | `labels.len() != scores.len()` |
/// | [`RfError::UndefinedAuc`] | all labels belong to one class |
pub fn roc_auc(labels: &[usize], scores: &[f64]) -> Result<f64, RfError> {
    if labels.len() != scores.len() {
        return Err(RfError::LabelCountMismatch {
            samples: scores.len(),
            labels: labels.len(),
        });
    }

    let n_positive = labels.iter().filter(|&&l| l == 1).count();
    let n_negative = labels.len() - n_positive;
    if n_positive == 0 || n_negative == 0 {
        return Err(RfError::UndefinedAuc {
            n_positive,
            n_negative,
        });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0f64;
    let mut start = 0usize;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group [start, end) shares the mean rank.
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&i| labels[i] == 1).count();
        positive_rank_sum += mean_rank * tied_positives as f64;
        start = end;
    }

    let n_pos = n_positive as f64;
    let n_neg = n_negative as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Fraction of predictions equal to their label.
///
/// Returns 0.0 for empty input.
///
/// # Errors
///
/// Returns [`RfError::LabelCountMismatch`] when the slices differ in length.
pub fn accuracy(labels: &[usize], predictions: &[usize]) -> Result<f64, RfError> {
    if labels.len() != predictions.len() {
        return Err(RfError::LabelCountMismatch {
            samples: predictions.len(),
            labels: labels.len(),
        });
    }
    if labels.is_empty() {
        return Ok(0.0);
    }
    let correct = labels
        .iter()
        .zip(predictions)
        .filter(|&(l, p)| l == p)
        .count();
    Ok(correct as f64 / labels.len() as f64)
}

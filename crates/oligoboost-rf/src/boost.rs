//! AdaBoost ensembles with a Random Forest base learner.
//!
//! Two multi-class variants are supported:
//!
//! - [`BoostAlgorithm::SammeR`] (real-valued): every round contributes
//!   `(K-1) * (ln p_k - mean_j ln p_j)` built from the forest's class
//!   probabilities, and sample weights are updated from the log-probability
//!   of the true class.
//! - [`BoostAlgorithm::Samme`] (discrete): every round contributes its weight
//!   `alpha = lr * (ln((1-err)/err) + ln(K-1))` to the predicted class, and
//!   misclassified samples are up-weighted by `exp(alpha)`.
//!
//! In both, the summed decision is normalized by the total estimator weight
//! and turned into probabilities with a softmax.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::predict::ClassDistribution;
use crate::tree::{argmax, validate_dataset};

/// Boosting variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum BoostAlgorithm {
    /// Real-valued SAMME.R, driven by class probabilities.
    #[default]
    SammeR,
    /// Discrete SAMME, driven by hard predictions.
    Samme,
}

/// Configuration for AdaBoost training.
///
/// # Defaults
///
/// | Parameter       | Default  |
/// |-----------------|----------|
/// | `learning_rate` | 1.0      |
/// | `algorithm`     | `SammeR` |
/// | `seed`          | 42       |
#[derive(Debug, Clone)]
pub struct AdaBoostConfig {
    n_rounds: usize,
    learning_rate: f64,
    algorithm: BoostAlgorithm,
    seed: u64,
}

impl AdaBoostConfig {
    /// Create a config running at most `n_rounds` boosting rounds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidRoundCount`] if `n_rounds` is zero.
    pub fn new(n_rounds: usize) -> Result<Self, RfError> {
        if n_rounds == 0 {
            return Err(RfError::InvalidRoundCount { n_rounds });
        }
        Ok(Self {
            n_rounds,
            learning_rate: 1.0,
            algorithm: BoostAlgorithm::SammeR,
            seed: 42,
        })
    }

    /// Set the learning rate (shrinks each round's contribution).
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the boosting variant.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: BoostAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the seed; round `r` trains its forest with `seed + r`.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the maximum number of rounds.
    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    /// Return the learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Return the boosting variant.
    #[must_use]
    pub fn algorithm(&self) -> BoostAlgorithm {
        self.algorithm
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fit a boosted ensemble of forests built from `base`.
    ///
    /// Boosting stops early when a round has zero weighted error (that
    /// round is kept) or when the updated weights sum to a non-finite or
    /// non-positive value.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::InvalidLearningRate`] | learning rate is not positive and finite |
    /// | [`RfError::BoostingFailed`] | SAMME discards the first round as no better than chance |
    /// | Dataset and forest errors | from validation and forest training |
    #[instrument(skip_all, fields(n_rounds = self.n_rounds, algorithm = ?self.algorithm))]
    pub fn fit(
        &self,
        base: &RandomForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<AdaBoost, RfError> {
        let n_features = validate_dataset(features, labels)?;
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(RfError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }

        let n_samples = features.len();
        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let mut weights = vec![1.0 / n_samples as f64; n_samples];

        let mut model = AdaBoost {
            estimators: Vec::with_capacity(self.n_rounds),
            estimator_weights: Vec::with_capacity(self.n_rounds),
            estimator_errors: Vec::with_capacity(self.n_rounds),
            n_features,
            n_classes,
            algorithm: self.algorithm,
        };

        for round in 0..self.n_rounds {
            let forest = base
                .clone()
                .with_seed(self.seed.wrapping_add(round as u64))
                .fit_weighted(features, labels, &weights)?
                .into_forest();
            let probas = forest.predict_proba_batch(features)?;

            let incorrect: Vec<bool> = probas
                .iter()
                .zip(labels)
                .map(|(p, &y)| p.predicted_class() != y)
                .collect();
            let total: f64 = weights.iter().sum();
            let error = incorrect
                .iter()
                .zip(&weights)
                .filter(|&(&miss, _)| miss)
                .map(|(_, &w)| w)
                .sum::<f64>()
                / total;

            if error <= 0.0 {
                debug!(round, "perfect round, stopping early");
                model.push(forest, 1.0, 0.0);
                break;
            }

            let is_last = round + 1 == self.n_rounds;
            let estimator_weight = match self.algorithm {
                BoostAlgorithm::SammeR => {
                    if !is_last {
                        self.update_weights_real(&mut weights, &probas, labels, n_classes);
                    }
                    1.0
                }
                BoostAlgorithm::Samme => {
                    let k = n_classes as f64;
                    if error >= 1.0 - 1.0 / k {
                        if model.estimators.is_empty() {
                            return Err(RfError::BoostingFailed {
                                reason: format!(
                                    "first round error {error:.4} is no better than chance for {n_classes} classes"
                                ),
                            });
                        }
                        warn!(round, error, "round no better than chance, stopping early");
                        break;
                    }
                    let alpha =
                        self.learning_rate * (((1.0 - error) / error).ln() + (k - 1.0).ln());
                    if !is_last {
                        for (w, &miss) in weights.iter_mut().zip(&incorrect) {
                            if miss && *w > 0.0 {
                                *w *= alpha.exp();
                            }
                        }
                    }
                    alpha
                }
            };

            model.push(forest, estimator_weight, error);
            debug!(round, error, estimator_weight, "boosting round complete");

            let weight_sum: f64 = weights.iter().sum();
            if !weight_sum.is_finite() {
                warn!(round, "sample weights are no longer finite, stopping early");
                break;
            }
            if weight_sum <= 0.0 {
                warn!(round, "sample weights sum to zero, stopping early");
                break;
            }
            if !is_last {
                weights.iter_mut().for_each(|w| *w /= weight_sum);
            }
        }

        info!(
            rounds_used = model.n_rounds_used(),
            n_classes,
            "boosting complete"
        );
        Ok(model)
    }

    /// SAMME.R update: `w_i *= exp(-lr * (K-1)/K * sum_k y_ik ln p_ik)`.
    ///
    /// `y_ik` is 1 for the true class and `-1/(K-1)` otherwise; probabilities
    /// are clipped to machine epsilon first.
    fn update_weights_real(
        &self,
        weights: &mut [f64],
        probas: &[ClassDistribution],
        labels: &[usize],
        n_classes: usize,
    ) {
        let k = n_classes as f64;
        let off_code = -1.0 / (k - 1.0);
        for ((w, proba), &y) in weights.iter_mut().zip(probas).zip(labels) {
            let coded_log_sum: f64 = (0..n_classes)
                .map(|c| {
                    let code = if c == y { 1.0 } else { off_code };
                    code * proba.probability(c).max(f64::EPSILON).ln()
                })
                .sum();
            let sample_weight = -self.learning_rate * (k - 1.0) / k * coded_log_sum;
            if *w > 0.0 || sample_weight < 0.0 {
                *w *= sample_weight.exp();
            }
        }
    }
}

/// A fitted AdaBoost ensemble of Random Forests.
#[derive(Debug, Clone)]
pub struct AdaBoost {
    estimators: Vec<RandomForest>,
    estimator_weights: Vec<f64>,
    estimator_errors: Vec<f64>,
    n_features: usize,
    n_classes: usize,
    algorithm: BoostAlgorithm,
}

impl AdaBoost {
    fn push(&mut self, forest: RandomForest, weight: f64, error: f64) {
        self.estimators.push(forest);
        self.estimator_weights.push(weight);
        self.estimator_errors.push(error);
    }

    /// Per-class decision scores for one sample, normalized by the total
    /// estimator weight.
    ///
    /// For two classes the sign of `scores[1] - scores[0]` gives the
    /// predicted class.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn decision_function(&self, sample: &[f64]) -> Result<Vec<f64>, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let k = self.n_classes;
        let mut scores = vec![0.0f64; k];
        for (forest, &alpha) in self.estimators.iter().zip(&self.estimator_weights) {
            let proba = forest.predict_proba(sample)?;
            match self.algorithm {
                BoostAlgorithm::SammeR => {
                    let log_p: Vec<f64> = (0..k)
                        .map(|c| proba.probability(c).max(f64::EPSILON).ln())
                        .collect();
                    let mean = log_p.iter().sum::<f64>() / k as f64;
                    for (s, lp) in scores.iter_mut().zip(&log_p) {
                        *s += (k as f64 - 1.0) * (lp - mean);
                    }
                }
                BoostAlgorithm::Samme => {
                    let predicted = proba.predicted_class();
                    let off = if k > 1 { -alpha / (k as f64 - 1.0) } else { 0.0 };
                    for (c, s) in scores.iter_mut().enumerate() {
                        *s += if c == predicted { alpha } else { off };
                    }
                }
            }
        }
        let normalizer: f64 = self.estimator_weights.iter().sum();
        scores.iter_mut().for_each(|s| *s /= normalizer);
        Ok(scores)
    }

    /// Class probabilities for one sample.
    ///
    /// Two classes: `softmax([-d/2, d/2])` with `d = scores[1] - scores[0]`.
    /// More classes: `softmax(scores / (K-1))`. A single class always gets 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        let scores = self.decision_function(sample)?;
        let probs = match self.n_classes {
            1 => vec![1.0],
            2 => {
                let d = scores[1] - scores[0];
                softmax(&[-d / 2.0, d / 2.0])
            }
            k => {
                let scaled: Vec<f64> = scores.iter().map(|s| s / (k as f64 - 1.0)).collect();
                softmax(&scaled)
            }
        };
        Ok(ClassDistribution::new(probs))
    }

    /// Predicted class for one sample.
    ///
    /// Two classes: class 1 iff `scores[1] - scores[0] > 0`. More classes:
    /// argmax of the decision, lowest class on ties.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        let scores = self.decision_function(sample)?;
        if self.n_classes == 2 {
            return Ok(usize::from(scores[1] - scores[0] > 0.0));
        }
        Ok(argmax(&scores))
    }

    /// Class probabilities for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Predicted classes for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Probability of class 1 for each sample, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn positive_proba_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, RfError> {
        features
            .into_par_iter()
            .map(|sample| Ok(self.predict_proba(sample)?.probability(1)))
            .collect()
    }

    /// Number of rounds that produced a kept estimator.
    #[must_use]
    pub fn n_rounds_used(&self) -> usize {
        self.estimators.len()
    }

    /// Weight of each kept estimator.
    #[must_use]
    pub fn estimator_weights(&self) -> &[f64] {
        &self.estimator_weights
    }

    /// Weighted training error of each kept estimator.
    #[must_use]
    pub fn estimator_errors(&self) -> &[f64] {
        &self.estimator_errors
    }

    /// Borrow the kept forests, in round order.
    #[must_use]
    pub fn estimators(&self) -> &[RandomForest] {
        &self.estimators
    }

    /// Number of classes seen in training.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxFeatures;

    /// Two overlapping 1-D classes: no single forest fits them perfectly.
    fn noisy_binary() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = i as f64;
            features.push(vec![x, (i % 5) as f64]);
            // Mostly threshold at 20, with every 7th label flipped.
            let base = usize::from(i >= 20);
            labels.push(if i % 7 == 3 { 1 - base } else { base });
        }
        (features, labels)
    }

    fn shallow_base() -> RandomForestConfig {
        RandomForestConfig::new(5)
            .unwrap()
            .with_max_depth(Some(1))
            .with_max_features(MaxFeatures::All)
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn zero_rounds_rejected() {
        assert!(matches!(
            AdaBoostConfig::new(0),
            Err(RfError::InvalidRoundCount { n_rounds: 0 })
        ));
    }

    #[test]
    fn invalid_learning_rate_rejected() {
        let (features, labels) = noisy_binary();
        let err = AdaBoostConfig::new(3)
            .unwrap()
            .with_learning_rate(0.0)
            .fit(&shallow_base(), &features, &labels)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidLearningRate { .. }));
    }

    #[test]
    fn perfect_first_round_stops_early() {
        // Wide gap between classes: every bootstrap threshold lands inside it.
        let features: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![if i < 10 { i as f64 } else { 90.0 + i as f64 }])
            .collect();
        let labels: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let base = RandomForestConfig::new(10).unwrap().with_max_features(MaxFeatures::All);
        let model = AdaBoostConfig::new(50).unwrap().fit(&base, &features, &labels).unwrap();
        assert_eq!(model.n_rounds_used(), 1);
        assert_eq!(model.estimator_errors(), &[0.0]);
        assert_eq!(model.predict_batch(&features).unwrap(), labels);
    }

    #[test]
    fn samme_r_probabilities_are_valid() {
        let (features, labels) = noisy_binary();
        let model = AdaBoostConfig::new(10)
            .unwrap()
            .fit(&shallow_base(), &features, &labels)
            .unwrap();
        assert!(model.n_rounds_used() >= 1);
        assert!(model.estimator_weights().iter().all(|&w| w == 1.0));
        for p in model.positive_proba_batch(&features).unwrap() {
            assert!((0.0..=1.0).contains(&p), "p = {p}");
        }
        for dist in model.predict_proba_batch(&features).unwrap() {
            assert!((dist.as_slice().iter().sum::<f64>() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn binary_prediction_follows_decision_sign() {
        let (features, labels) = noisy_binary();
        let model = AdaBoostConfig::new(5)
            .unwrap()
            .fit(&shallow_base(), &features, &labels)
            .unwrap();
        for sample in &features {
            let scores = model.decision_function(sample).unwrap();
            let expected = usize::from(scores[1] - scores[0] > 0.0);
            assert_eq!(model.predict(sample).unwrap(), expected);
        }
    }

    #[test]
    fn samme_weights_are_positive_alphas() {
        let (features, labels) = noisy_binary();
        let model = AdaBoostConfig::new(5)
            .unwrap()
            .with_algorithm(BoostAlgorithm::Samme)
            .with_learning_rate(0.5)
            .fit(&shallow_base(), &features, &labels)
            .unwrap();
        assert!(model.n_rounds_used() >= 1);
        for (&w, &err) in model.estimator_weights().iter().zip(model.estimator_errors()) {
            if err > 0.0 {
                let expected = 0.5 * ((1.0 - err) / err).ln();
                assert!((w - expected).abs() < 1e-12);
            }
        }
        for p in model.positive_proba_batch(&features).unwrap() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn boosting_is_deterministic() {
        let (features, labels) = noisy_binary();
        let config = AdaBoostConfig::new(4).unwrap().with_seed(11);
        let a = config.fit(&shallow_base(), &features, &labels).unwrap();
        let b = config.fit(&shallow_base(), &features, &labels).unwrap();
        assert_eq!(
            a.positive_proba_batch(&features).unwrap(),
            b.positive_proba_batch(&features).unwrap()
        );
    }

    #[test]
    fn three_class_probabilities() {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            features.push(vec![i as f64]);
            labels.push(i / 10);
        }
        let model = AdaBoostConfig::new(3)
            .unwrap()
            .fit(&shallow_base(), &features, &labels)
            .unwrap();
        assert_eq!(model.n_classes(), 3);
        let dist = model.predict_proba(&[5.0]).unwrap();
        assert_eq!(dist.as_slice().len(), 3);
        assert!((dist.as_slice().iter().sum::<f64>() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn feature_mismatch_rejected() {
        let (features, labels) = noisy_binary();
        let model = AdaBoostConfig::new(2)
            .unwrap()
            .fit(&shallow_base(), &features, &labels)
            .unwrap();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(RfError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
    }
}

//! Exhaustive hyperparameter search over Random Forest configurations.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::eval::{CrossValidation, CvScore};
use crate::forest::RandomForest;

/// One point of the hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParamSet {
    /// Maximum tree depth, `None` for unlimited.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Number of trees in the forest.
    pub n_estimators: usize,
}

impl ParamSet {
    /// Overlay these parameters on `base`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_estimators` is zero.
    pub fn apply(&self, base: &RandomForestConfig) -> Result<RandomForestConfig, RfError> {
        Ok(base
            .clone()
            .with_n_trees(self.n_estimators)?
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split))
    }
}

/// Value lists for each tuned parameter.
///
/// Candidates are enumerated with parameter names in alphabetical order
/// (`max_depth`, `min_samples_split`, `n_estimators`), the last one varying
/// fastest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    max_depth: Vec<Option<usize>>,
    min_samples_split: Vec<usize>,
    n_estimators: Vec<usize>,
}

impl ParamGrid {
    /// Build a grid from explicit value lists.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::EmptyGrid`] naming the first parameter with no values.
    pub fn new(
        max_depth: Vec<Option<usize>>,
        min_samples_split: Vec<usize>,
        n_estimators: Vec<usize>,
    ) -> Result<Self, RfError> {
        if max_depth.is_empty() {
            return Err(RfError::EmptyGrid { parameter: "max_depth" });
        }
        if min_samples_split.is_empty() {
            return Err(RfError::EmptyGrid { parameter: "min_samples_split" });
        }
        if n_estimators.is_empty() {
            return Err(RfError::EmptyGrid { parameter: "n_estimators" });
        }
        Ok(Self {
            max_depth,
            min_samples_split,
            n_estimators,
        })
    }

    /// Enumerate every combination in grid order.
    #[must_use]
    pub fn candidates(&self) -> Vec<ParamSet> {
        let mut out = Vec::with_capacity(self.len());
        for &max_depth in &self.max_depth {
            for &min_samples_split in &self.min_samples_split {
                for &n_estimators in &self.n_estimators {
                    out.push(ParamSet {
                        max_depth,
                        min_samples_split,
                        n_estimators,
                    });
                }
            }
        }
        out
    }

    /// Return the number of combinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.max_depth.len() * self.min_samples_split.len() * self.n_estimators.len()
    }

    /// Always `false`: a constructed grid has at least one candidate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the first candidate in grid order.
    #[must_use]
    pub fn first(&self) -> ParamSet {
        ParamSet {
            max_depth: self.max_depth[0],
            min_samples_split: self.min_samples_split[0],
            n_estimators: self.n_estimators[0],
        }
    }
}

impl Default for ParamGrid {
    /// The 27-candidate grid: `n_estimators` ∈ {25, 50, 75},
    /// `max_depth` ∈ {None, 5, 10}, `min_samples_split` ∈ {2, 5, 10}.
    fn default() -> Self {
        Self {
            max_depth: vec![None, Some(5), Some(10)],
            min_samples_split: vec![2, 5, 10],
            n_estimators: vec![25, 50, 75],
        }
    }
}

/// Cross-validated score of one candidate.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CandidateScore {
    /// The evaluated parameters.
    pub params: ParamSet,
    /// Its cross-validated ROC-AUC.
    pub score: CvScore,
}

/// Grid search driver: scores every candidate with stratified CV.
///
/// By default the winning candidate is refit on the full training set; see
/// [`GridSearch::with_refit`].
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    cv: CrossValidation,
    refit: bool,
}

impl GridSearch {
    /// Create a search over `grid` evaluated with `cv`.
    #[must_use]
    pub fn new(grid: ParamGrid, cv: CrossValidation) -> Self {
        Self {
            grid,
            cv,
            refit: true,
        }
    }

    /// Set whether the winner is refit on all data after scoring.
    #[must_use]
    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    /// Return whether the winner is refit after scoring.
    #[must_use]
    pub fn refit(&self) -> bool {
        self.refit
    }

    /// Score every candidate, pick the best mean AUC, and optionally refit it.
    ///
    /// Candidates are scored in parallel; the winner is the first candidate
    /// in grid order that reaches the highest mean score. The refit forest
    /// uses `base.seed()`.
    ///
    /// # Errors
    ///
    /// Any [`RfError`] raised by cross-validation or the final refit.
    #[instrument(skip_all, fields(n_candidates = self.grid.len(), n_folds = self.cv.n_folds()))]
    pub fn fit(
        &self,
        base: &RandomForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<GridSearchResult, RfError> {
        let candidates: Vec<CandidateScore> = self
            .grid
            .candidates()
            .into_par_iter()
            .map(|params| {
                let config = params.apply(base)?;
                let score = self.cv.score_auc(&config, features, labels)?;
                debug!(?params, mean_auc = score.mean, "candidate scored");
                Ok(CandidateScore { params, score })
            })
            .collect::<Result<_, RfError>>()?;

        let mut best_index = 0usize;
        for (i, candidate) in candidates.iter().enumerate().skip(1) {
            if candidate.score.mean > candidates[best_index].score.mean {
                best_index = i;
            }
        }
        let best = &candidates[best_index];
        info!(
            params = ?best.params,
            mean_auc = best.score.mean,
            "grid search selected best candidate"
        );

        let best_forest = if self.refit {
            Some(best.params.apply(base)?.fit(features, labels)?.into_forest())
        } else {
            None
        };

        Ok(GridSearchResult {
            candidates,
            best_index,
            best_forest,
        })
    }
}

/// Outcome of a [`GridSearch`].
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    candidates: Vec<CandidateScore>,
    best_index: usize,
    best_forest: Option<RandomForest>,
}

impl GridSearchResult {
    /// Return the winning parameters.
    #[must_use]
    pub fn best_params(&self) -> ParamSet {
        self.candidates[self.best_index].params
    }

    /// Return the winning mean cross-validated AUC.
    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.candidates[self.best_index].score.mean
    }

    /// Return every candidate's score, in grid order.
    #[must_use]
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }

    /// Borrow the winning forest refit on the full training set, if refit ran.
    #[must_use]
    pub fn best_forest(&self) -> Option<&RandomForest> {
        self.best_forest.as_ref()
    }

    /// Consume the result and return the refit forest, if refit ran.
    #[must_use]
    pub fn into_best_forest(self) -> Option<RandomForest> {
        self.best_forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_order() {
        let candidates = ParamGrid::default().candidates();
        assert_eq!(candidates.len(), 27);
        assert_eq!(
            candidates[0],
            ParamSet { max_depth: None, min_samples_split: 2, n_estimators: 25 }
        );
        assert_eq!(
            candidates[1],
            ParamSet { max_depth: None, min_samples_split: 2, n_estimators: 50 }
        );
        assert_eq!(
            candidates[3],
            ParamSet { max_depth: None, min_samples_split: 5, n_estimators: 25 }
        );
        assert_eq!(
            candidates[26],
            ParamSet { max_depth: Some(10), min_samples_split: 10, n_estimators: 75 }
        );
        assert_eq!(ParamGrid::default().first(), candidates[0]);
    }

    #[test]
    fn empty_value_list_rejected() {
        let err = ParamGrid::new(vec![None], vec![], vec![10]).unwrap_err();
        assert!(matches!(err, RfError::EmptyGrid { parameter: "min_samples_split" }));
    }

    #[test]
    fn apply_overrides_only_grid_parameters() {
        let base = RandomForestConfig::new(100).unwrap().with_seed(9).with_min_samples_leaf(2);
        let params = ParamSet { max_depth: Some(5), min_samples_split: 10, n_estimators: 50 };
        let config = params.apply(&base).unwrap();
        assert_eq!(config.n_trees(), 50);
        assert_eq!(config.max_depth(), Some(5));
        assert_eq!(config.min_samples_split(), 10);
        assert_eq!(config.seed(), 9);
        assert_eq!(config.min_samples_leaf(), 2);
    }

    #[test]
    fn search_returns_first_best_and_refits() {
        // Perfectly separable: every candidate scores AUC 1.0, so the first wins.
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..15 {
            features.push(vec![i as f64, 1.0]);
            labels.push(0);
            features.push(vec![100.0 + i as f64, 1.0]);
            labels.push(1);
        }
        let grid = ParamGrid::new(vec![None, Some(2)], vec![2], vec![5, 10]).unwrap();
        let cv = CrossValidation::new(3).unwrap();
        let base = RandomForestConfig::new(1).unwrap();
        let result = GridSearch::new(grid, cv).fit(&base, &features, &labels).unwrap();

        assert_eq!(result.candidates().len(), 4);
        assert!((result.best_score() - 1.0).abs() < 1e-12);
        assert_eq!(
            result.best_params(),
            ParamSet { max_depth: None, min_samples_split: 2, n_estimators: 5 }
        );
        assert_eq!(result.best_forest().unwrap().n_trees(), 5);
        assert_eq!(result.into_best_forest().unwrap().n_features(), 2);
    }

    #[test]
    fn search_without_refit_keeps_scores_only() {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i), 0.0]).collect();
        let labels: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let grid = ParamGrid::new(vec![None], vec![2, 5], vec![5]).unwrap();
        let search = GridSearch::new(grid, CrossValidation::new(2).unwrap()).with_refit(false);
        assert!(!search.refit());

        let base = RandomForestConfig::new(1).unwrap();
        let result = search.fit(&base, &features, &labels).unwrap();
        assert_eq!(result.candidates().len(), 2);
        assert_eq!(result.best_params().min_samples_split, 2);
        assert!(result.best_forest().is_none());
        assert!(result.into_best_forest().is_none());
    }
}

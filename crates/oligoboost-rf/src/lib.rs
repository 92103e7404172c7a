//! Random Forest classification with cross-validated tuning and boosting.
//!
//! Provides a hand-rolled Random Forest classifier with weighted CART
//! decision trees, Gini/Entropy split criteria and parallel training via
//! rayon, plus the routines built on top of it: stratified k-fold
//! cross-validation scored by ROC-AUC, exhaustive grid search, and
//! SAMME/SAMME.R AdaBoost with the forest as base learner.

mod boost;
mod config;
mod error;
mod eval;
mod forest;
mod grid;
mod metrics;
mod node;
mod predict;
mod result;
mod split;
mod tree;

pub use boost::{AdaBoost, AdaBoostConfig, BoostAlgorithm};
pub use config::{MaxFeatures, RandomForestConfig};
pub use error::RfError;
pub use eval::{CrossValidation, CvScore, feasible_fold_count};
pub use forest::RandomForest;
pub use grid::{CandidateScore, GridSearch, GridSearchResult, ParamGrid, ParamSet};
pub use metrics::{accuracy, roc_auc};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};

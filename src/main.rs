use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use oligoboost_encode::{FeatureAssembler, StandardScaler, max_sequence_length};
use oligoboost_io::{PredictionWriter, SequenceReader};
use oligoboost_rf::{
    AdaBoostConfig, CrossValidation, GridSearch, ParamGrid, ParamSet, RandomForestConfig,
    accuracy, feasible_fold_count, roc_auc,
};

/// Folds requested for the hyperparameter search.
const CV_FOLDS: usize = 5;
/// AdaBoost rounds wrapped around the tuned forest.
const BOOST_ROUNDS: usize = 50;

#[derive(Parser)]
#[command(name = "oligoboost")]
#[command(about = "Classify positive and negative RNA oligonucleotide sequences using AdaBoost")]
#[command(version)]
struct Cli {
    /// Path to the training CSV (ID, Sequence, Label)
    #[arg(long = "train_file")]
    train_file: PathBuf,

    /// Path to the test CSV (ID, Sequence)
    #[arg(long = "test_file")]
    test_file: PathBuf,

    /// Path to write the ID,Label probability CSV
    #[arg(long = "output_file")]
    output_file: PathBuf,

    /// RNG seed for fold shuffling and forest training
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,
}

// --- JSON stdout output struct ---

#[derive(Serialize)]
struct RunOutput {
    n_train: usize,
    n_test: usize,
    max_length: usize,
    n_features: usize,
    cv_folds: Option<usize>,
    best_params: ParamSet,
    best_cv_auc: Option<f64>,
    boosting_rounds_used: usize,
    train_auc: Option<f64>,
    train_accuracy: f64,
    output_file: PathBuf,
}

/// Pick forest hyperparameters, by grid search when the labels allow it.
///
/// Returns the chosen parameters plus the fold count and best mean CV AUC
/// when a search ran. No forest is refit here; boosting trains its own.
fn tune(
    base: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    seed: u64,
) -> Result<(ParamSet, Option<(usize, f64)>)> {
    let grid = ParamGrid::default();
    let both_classes = labels.contains(&0) && labels.contains(&1);
    let folds = if both_classes {
        feasible_fold_count(labels, CV_FOLDS)
    } else {
        None
    };

    let Some(n_folds) = folds else {
        let params = grid.first();
        warn!(
            ?params,
            "too few samples per class for stratified CV, skipping grid search"
        );
        return Ok((params, None));
    };

    if n_folds < CV_FOLDS {
        warn!(n_folds, requested = CV_FOLDS, "smallest class limits the fold count");
    }
    let cv = CrossValidation::new(n_folds)?.with_seed(seed);
    let result = GridSearch::new(grid, cv)
        .with_refit(false)
        .fit(base, features, labels)
        .context("grid search failed")?;
    Ok((result.best_params(), Some((n_folds, result.best_score()))))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    // 1. Load
    let train = SequenceReader::new(&cli.train_file)
        .read_labeled()
        .context("failed to read training CSV")?;
    let test = SequenceReader::new(&cli.test_file)
        .read_unlabeled()
        .context("failed to read test CSV")?;
    let labels = train
        .labels()
        .context("training table has unlabeled records")?;

    // 2. Encode, with one max_length shared by both tables
    let train_sequences = train.sequences();
    let test_sequences = test.sequences();
    let max_length = max_sequence_length(train_sequences.iter().chain(&test_sequences).copied());
    let assembler = FeatureAssembler::new(max_length);
    let train_matrix = assembler
        .assemble(&train_sequences)
        .context("failed to encode training sequences")?;
    let test_matrix = assembler
        .assemble(&test_sequences)
        .context("failed to encode test sequences")?;
    info!(max_length, n_features = assembler.width(), "sequences encoded");

    // 3. Scale, fit on train only
    let (scaler, train_scaled) =
        StandardScaler::fit_transform(&train_matrix).context("failed to fit scaler")?;
    let test_scaled = scaler
        .transform(&test_matrix)
        .context("failed to scale test features")?;
    let train_features = train_scaled.into_rows();
    let test_features = test_scaled.into_rows();

    // 4. Tune
    let base = RandomForestConfig::new(ParamGrid::default().first().n_estimators)?
        .with_seed(cli.seed);
    let (best_params, search) = tune(&base, &train_features, &labels, cli.seed)?;
    info!(
        ?best_params,
        best_cv_auc = ?search.map(|(_, score)| score),
        "forest tuned"
    );

    // 5. Boost around the tuned configuration
    let tuned = best_params.apply(&base)?;
    let model = AdaBoostConfig::new(BOOST_ROUNDS)?
        .with_seed(cli.seed)
        .fit(&tuned, &train_features, &labels)
        .context("boosting failed")?;

    // 6. Report training diagnostics
    let train_scores = model.positive_proba_batch(&train_features)?;
    let train_auc = match roc_auc(&labels, &train_scores) {
        Ok(auc) => Some(auc),
        Err(e) => {
            warn!(error = %e, "training AUC unavailable");
            None
        }
    };
    let train_predictions = model.predict_batch(&train_features)?;
    let train_accuracy = accuracy(&labels, &train_predictions)?;
    info!(train_auc = ?train_auc, train_accuracy, "training set evaluated");

    // 7. Predict and write
    let test_scores = model
        .positive_proba_batch(&test_features)
        .context("test prediction failed")?;
    PredictionWriter::new(&cli.output_file)
        .write(&test.ids(), &test_scores)
        .context("failed to write predictions")?;

    let output = RunOutput {
        n_train: train.len(),
        n_test: test.len(),
        max_length,
        n_features: assembler.width(),
        cv_folds: search.map(|(n_folds, _)| n_folds),
        best_params,
        best_cv_auc: search.map(|(_, score)| score),
        boosting_rounds_used: model.n_rounds_used(),
        train_auc,
        train_accuracy,
        output_file: cli.output_file,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

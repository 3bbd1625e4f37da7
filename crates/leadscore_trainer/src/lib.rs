//! Lead scoring trainer - deterministic offline random forest trainer
//!
//! Fits a random forest on a historical lead export, evaluates it, and
//! compiles it into the portable artifact the scoring runtime loads. Also
//! hosts exact attribution, which needs the fitted forest's node statistics.

pub mod attribution;
pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod metrics;
pub mod trainer;

use chrono::Utc;
use leadscore_core::{
    compile_ensemble, CompileError, EnsembleArtifact, FeatureVocabulary, FittedForest, LeadSchema,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub use attribution::{Attribution, ExactExplainer};
pub use cart::{MaxFeatures, TreeConfig};
pub use dataset::{Dataset, TARGET_COLUMN};
pub use deterministic::LcgRng;
pub use errors::TrainerError;
pub use metrics::{ClassificationReport, CrossValidation, FeatureImportance, TrainingReport};
pub use trainer::{ForestConfig, RandomForestTrainer, TrainedForest};

/// Features listed in the training report
pub const REPORT_TOP_FEATURES: usize = 10;

/// Everything that controls one training run
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingOptions {
    pub forest: ForestConfig,
    /// Share of each class held out for testing, in `[0, 1)`
    pub test_fraction: f64,
    /// Cross-validation folds; fewer than two disables it
    pub cv_folds: usize,
    pub shuffle: bool,
    pub schema: LeadSchema,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            test_fraction: 0.2,
            cv_folds: 5,
            shuffle: true,
            schema: LeadSchema::standard(),
        }
    }
}

/// Fitted forest together with the vocabulary its feature indices refer to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub vocabulary: FeatureVocabulary,
    pub forest: FittedForest,
}

impl FittedModel {
    pub fn compile(&self) -> Result<EnsembleArtifact, CompileError> {
        compile_ensemble(&self.forest, &self.vocabulary)
    }

    pub fn explainer(&self, top_k: usize) -> Result<ExactExplainer<'_>, CompileError> {
        ExactExplainer::new(&self.forest, &self.vocabulary, top_k)
    }
}

/// Result of a full training run
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    pub model: FittedModel,
    pub artifact: EnsembleArtifact,
    pub report: TrainingReport,
}

/// Train and compile a model directly from a CSV file.
pub fn train_from_csv(path: &Path, options: &TrainingOptions) -> Result<TrainingOutcome, TrainerError> {
    let dataset = Dataset::from_csv(path).map_err(|err| TrainerError::Dataset(format!("{err:#}")))?;
    train_dataset(dataset, options)
}

/// Train, evaluate and compile a model from an in-memory dataset.
pub fn train_dataset(mut dataset: Dataset, options: &TrainingOptions) -> Result<TrainingOutcome, TrainerError> {
    if !(0.0..1.0).contains(&options.test_fraction) {
        return Err(TrainerError::Training(format!(
            "test fraction must lie in [0, 1), got {}",
            options.test_fraction
        )));
    }

    let seed = options.forest.seed;
    if options.shuffle {
        dataset.shuffle(seed);
    }

    let vocabulary = dataset.vocabulary(&options.schema);
    if vocabulary.is_empty() {
        return Err(TrainerError::Dataset("no feature columns left after exclusions".into()));
    }
    info!(
        rows = dataset.len(),
        features = vocabulary.len(),
        class_counts = ?dataset.class_counts(),
        "prepared dataset"
    );

    let (train, test) = dataset.split(options.test_fraction, seed);
    if train.is_empty() {
        return Err(TrainerError::Dataset("training split is empty".into()));
    }
    let train_x = train.to_matrix(&vocabulary);
    let test_x = test.to_matrix(&vocabulary);

    let trainer = RandomForestTrainer::new(options.forest.clone());
    let trained = trainer.train(&train_x, &train.targets)?;

    let train_accuracy = metrics::accuracy(&trained.forest, &train_x, &train.targets);
    let (test_accuracy, classification) = if test.is_empty() {
        (None, None)
    } else {
        (
            Some(metrics::accuracy(&trained.forest, &test_x, &test.targets)),
            Some(ClassificationReport::evaluate(&trained.forest, &test_x, &test.targets)),
        )
    };
    info!(train_accuracy, ?test_accuracy, "evaluated forest");

    let cross_validation = cross_validate(&dataset, &vocabulary, options)?;

    let model = FittedModel {
        vocabulary,
        forest: trained.forest,
    };
    let artifact = model.compile()?;
    let artifact_hash = artifact.hash_hex().map_err(leadscore_core::CoreError::from)?;

    let report = TrainingReport {
        trained_at: Utc::now(),
        data_size: dataset.len(),
        num_features: model.vocabulary.len(),
        train_size: train.len(),
        test_size: test.len(),
        config: options.forest.clone(),
        train_accuracy,
        test_accuracy,
        classification,
        cross_validation,
        top_features: metrics::top_features(&model.vocabulary, &trained.importances, REPORT_TOP_FEATURES),
        artifact_hash,
    };

    Ok(TrainingOutcome {
        model,
        artifact,
        report,
    })
}

/// K-fold accuracy over the whole dataset; row `i` lands in fold `i % k`.
fn cross_validate(
    dataset: &Dataset,
    vocabulary: &FeatureVocabulary,
    options: &TrainingOptions,
) -> Result<Option<CrossValidation>, TrainerError> {
    let k = options.cv_folds;
    if k < 2 {
        return Ok(None);
    }
    if dataset.len() < k {
        warn!(rows = dataset.len(), folds = k, "too few rows for cross-validation, skipping");
        return Ok(None);
    }

    let matrix = dataset.to_matrix(vocabulary);
    let trainer = RandomForestTrainer::new(options.forest.clone());
    let mut scores = Vec::with_capacity(k);

    for fold in 0..k {
        let (mut fit_x, mut fit_y, mut eval_x, mut eval_y) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
        for (i, (row, &target)) in matrix.iter().zip(&dataset.targets).enumerate() {
            if i % k == fold {
                eval_x.push(row.clone());
                eval_y.push(target);
            } else {
                fit_x.push(row.clone());
                fit_y.push(target);
            }
        }
        let trained = trainer.train(&fit_x, &fit_y)?;
        scores.push(metrics::accuracy(&trained.forest, &eval_x, &eval_y));
    }

    let cv = CrossValidation::from_scores(scores);
    info!(folds = k, mean = cv.mean, std = cv.std, "cross-validation complete");
    Ok(Some(cv))
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

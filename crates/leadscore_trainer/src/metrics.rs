//! Evaluation metrics and the training report

use chrono::{DateTime, Utc};
use leadscore_core::{FeatureVocabulary, FittedForest};
use serde::{Deserialize, Serialize};

use crate::trainer::ForestConfig;

/// Class predicted by a forest: positive when the mean probability
/// exceeds one half
pub fn predict_class(forest: &FittedForest, values: &[f64]) -> u8 {
    u8::from(forest.predict_proba(values) > 0.5)
}

pub fn accuracy(forest: &FittedForest, features: &[Vec<f64>], targets: &[u8]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let correct = features
        .iter()
        .zip(targets)
        .filter(|&(row, &t)| predict_class(forest, row) == t)
        .count();
    correct as f64 / targets.len() as f64
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics, indexed by label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: [ClassMetrics; 2],
}

impl ClassificationReport {
    pub fn evaluate(forest: &FittedForest, features: &[Vec<f64>], targets: &[u8]) -> Self {
        // confusion[actual][predicted]
        let mut confusion = [[0usize; 2]; 2];
        for (row, &actual) in features.iter().zip(targets) {
            confusion[actual as usize][predict_class(forest, row) as usize] += 1;
        }

        let class = |c: usize| {
            let tp = confusion[c][c] as f64;
            let predicted = (confusion[0][c] + confusion[1][c]) as f64;
            let support = confusion[c][0] + confusion[c][1];
            let precision = if predicted > 0.0 { tp / predicted } else { 0.0 };
            let recall = if support > 0 { tp / support as f64 } else { 0.0 };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        };

        Self {
            classes: [class(0), class(1)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub folds: usize,
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl CrossValidation {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            folds: scores.len(),
            scores,
            mean,
            std: variance.sqrt(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// The `limit` most important features, highest first
pub fn top_features(
    vocabulary: &FeatureVocabulary,
    importances: &[f64],
    limit: usize,
) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = vocabulary
        .names()
        .iter()
        .zip(importances)
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked.truncate(limit);
    ranked
}

/// Everything recorded about one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub data_size: usize,
    pub num_features: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub config: ForestConfig,
    pub train_accuracy: f64,
    pub test_accuracy: Option<f64>,
    pub classification: Option<ClassificationReport>,
    pub cross_validation: Option<CrossValidation>,
    pub top_features: Vec<FeatureImportance>,
    /// Blake3 hex digest of the compiled artifact
    pub artifact_hash: String,
}

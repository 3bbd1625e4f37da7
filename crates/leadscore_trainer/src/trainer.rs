//! Random forest trainer
//!
//! Bagged Gini trees. Each tree draws its own seed from the forest seed and
//! its index, so fitting trees in parallel yields the same forest as fitting
//! them one after another.

use leadscore_core::FittedForest;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cart::{CartBuilder, GrownTree, TreeConfig};
use crate::deterministic::{tree_seed, LcgRng};
use crate::errors::TrainerError;

/// Random forest training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub tree: TreeConfig,
    /// Draw each tree's rows with replacement
    pub bootstrap: bool,
    pub seed: u64,
    /// Fit trees on the rayon pool
    pub parallel: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            tree: TreeConfig::default(),
            bootstrap: true,
            seed: 42,
            parallel: true,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.n_trees == 0 {
            return Err(TrainerError::Training("forest needs at least one tree".into()));
        }
        if self.tree.min_samples_leaf == 0 {
            return Err(TrainerError::Training("min_samples_leaf must be positive".into()));
        }
        if self.tree.min_samples_split < 2 {
            return Err(TrainerError::Training("min_samples_split must be at least 2".into()));
        }
        Ok(())
    }
}

/// Fitted forest with normalized impurity-based feature importances
#[derive(Clone, Debug)]
pub struct TrainedForest {
    pub forest: FittedForest,
    /// One entry per feature column, summing to 1 unless no tree split
    pub importances: Vec<f64>,
}

/// Random forest trainer
pub struct RandomForestTrainer {
    config: ForestConfig,
}

impl RandomForestTrainer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Train a forest on an encoded feature matrix
    pub fn train(&self, features: &[Vec<f64>], targets: &[u8]) -> Result<TrainedForest, TrainerError> {
        self.config.validate()?;
        if features.is_empty() {
            return Err(TrainerError::Training("no training rows".into()));
        }
        if features.len() != targets.len() {
            return Err(TrainerError::Training(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        if targets.iter().any(|&t| t > 1) {
            return Err(TrainerError::Training("targets must be 0 or 1".into()));
        }
        let feature_count = features[0].len();
        if feature_count == 0 || features.iter().any(|row| row.len() != feature_count) {
            return Err(TrainerError::Training("feature rows must share a non-zero width".into()));
        }

        info!(
            trees = self.config.n_trees,
            rows = features.len(),
            features = feature_count,
            parallel = self.config.parallel,
            "training random forest"
        );

        let fit = |index: usize| self.fit_tree(index, features, targets);
        let grown: Vec<GrownTree> = if self.config.parallel {
            (0..self.config.n_trees).into_par_iter().map(fit).collect()
        } else {
            (0..self.config.n_trees).map(fit).collect()
        };

        let importances = forest_importances(&grown, feature_count);
        let forest = FittedForest::new(grown.into_iter().map(|g| g.tree).collect());
        info!(
            nodes = forest.trees.iter().map(|t| t.node_count()).sum::<usize>(),
            "forest trained"
        );

        Ok(TrainedForest {
            forest,
            importances,
        })
    }

    fn fit_tree(&self, index: usize, features: &[Vec<f64>], targets: &[u8]) -> GrownTree {
        let mut rng = LcgRng::new(tree_seed(self.config.seed, index));
        let n = features.len();

        let mut weights = vec![0.0; n];
        if self.config.bootstrap {
            for _ in 0..n {
                weights[rng.next_range(n)] += 1.0;
            }
        } else {
            weights.fill(1.0);
        }

        let grown = CartBuilder::new(features, targets, &weights, &self.config.tree).build(&mut rng);
        debug!(tree = index, nodes = grown.tree.node_count(), "fitted tree");
        grown
    }
}

/// Mean over trees of each tree's normalized impurity decrease
fn forest_importances(grown: &[GrownTree], feature_count: usize) -> Vec<f64> {
    let mut importances = vec![0.0; feature_count];
    for tree in grown {
        let total: f64 = tree.impurity_decrease.iter().sum();
        if total > 0.0 {
            for (acc, dec) in importances.iter_mut().zip(&tree.impurity_decrease) {
                *acc += dec / total;
            }
        }
    }

    let sum: f64 = importances.iter().sum();
    if sum > 0.0 {
        importances.iter_mut().for_each(|v| *v /= sum);
    }
    importances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut features = Vec::new();
        let mut targets = Vec::new();
        for i in 0..40 {
            let views = (i % 20) as f64;
            let noise = ((i * 7) % 5) as f64;
            features.push(vec![views, noise]);
            targets.push(u8::from(views > 9.0));
        }
        (features, targets)
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (features, targets) = toy_data();
        let parallel = RandomForestTrainer::new(ForestConfig {
            n_trees: 12,
            ..ForestConfig::default()
        })
        .train(&features, &targets)
        .unwrap();
        let sequential = RandomForestTrainer::new(ForestConfig {
            n_trees: 12,
            parallel: false,
            ..ForestConfig::default()
        })
        .train(&features, &targets)
        .unwrap();

        assert_eq!(parallel.forest, sequential.forest);
        assert_eq!(parallel.importances, sequential.importances);
    }

    #[test]
    fn test_seed_changes_forest() {
        let (features, targets) = toy_data();
        let a = RandomForestTrainer::new(ForestConfig {
            n_trees: 5,
            ..ForestConfig::default()
        })
        .train(&features, &targets)
        .unwrap();
        let b = RandomForestTrainer::new(ForestConfig {
            n_trees: 5,
            seed: 7,
            ..ForestConfig::default()
        })
        .train(&features, &targets)
        .unwrap();
        assert_ne!(a.forest, b.forest);
    }

    #[test]
    fn test_learns_separable_signal() {
        let (features, targets) = toy_data();
        let trained = RandomForestTrainer::new(ForestConfig {
            n_trees: 20,
            ..ForestConfig::default()
        })
        .train(&features, &targets)
        .unwrap();

        assert_eq!(trained.forest.len(), 20);
        assert!(trained.forest.predict_proba(&[18.0, 1.0]) > 0.5);
        assert!(trained.forest.predict_proba(&[1.0, 1.0]) < 0.5);
        assert!(trained.importances[0] > trained.importances[1]);
        assert!((trained.importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_input() {
        let trainer = RandomForestTrainer::new(ForestConfig::default());
        assert!(trainer.train(&[], &[]).is_err());
        assert!(trainer.train(&[vec![1.0]], &[0, 1]).is_err());
        assert!(trainer.train(&[vec![1.0]], &[2]).is_err());

        let no_trees = RandomForestTrainer::new(ForestConfig {
            n_trees: 0,
            ..ForestConfig::default()
        });
        assert!(no_trees.train(&[vec![1.0]], &[1]).is_err());
    }
}

//! CART (Classification and Regression Tree) builder
//!
//! Greedy binary classification trees with Gini impurity. Rows carry
//! weights (bootstrap draw counts), candidate thresholds are midpoints
//! between consecutive distinct values, and each split considers a random
//! feature subset. Output is the fitted node-array layout the compiler
//! consumes, laid out in pre-order.

use leadscore_core::fitted::{FittedTree, LEAF_CHILD, LEAF_FEATURE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::deterministic::LcgRng;

/// Number of features considered at each split
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(self, feature_count: usize) -> usize {
        let k = match self {
            Self::All => feature_count,
            Self::Sqrt => (feature_count as f64).sqrt() as usize,
            Self::Log2 => (feature_count as f64).log2() as usize,
            Self::Count(k) => k,
        };
        k.clamp(1, feature_count.max(1))
    }
}

impl FromStr for MaxFeatures {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "sqrt" => Ok(Self::Sqrt),
            "log2" => Ok(Self::Log2),
            n => n
                .parse::<usize>()
                .ok()
                .filter(|&k| k > 0)
                .map(Self::Count)
                .ok_or_else(|| format!("expected all, sqrt, log2 or a positive count, got `{n}`")),
        }
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Sqrt => write!(f, "sqrt"),
            Self::Log2 => write!(f, "log2"),
            Self::Count(k) => write!(f, "{k}"),
        }
    }
}

/// Training parameters for a single tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

/// A fitted tree with the impurity decrease credited to each feature
#[derive(Clone, Debug)]
pub struct GrownTree {
    pub tree: FittedTree,
    /// Unnormalized weighted impurity decrease per feature
    pub impurity_decrease: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

fn gini([negative, positive]: [f64; 2]) -> f64 {
    let total = negative + positive;
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    let q = negative / total;
    1.0 - p * p - q * q
}

/// Builds one classification tree over a fixed feature matrix
pub struct CartBuilder<'a> {
    config: &'a TreeConfig,
    features: &'a [Vec<f64>],
    targets: &'a [u8],
    weights: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    /// `weights[i]` is how many times row `i` was drawn; zero-weight rows
    /// are ignored.
    pub fn new(
        features: &'a [Vec<f64>],
        targets: &'a [u8],
        weights: &'a [f64],
        config: &'a TreeConfig,
    ) -> Self {
        let feature_count = features.first().map_or(0, Vec::len);
        Self {
            config,
            features,
            targets,
            weights,
            feature_count,
        }
    }

    /// Build tree and return nodes
    pub fn build(&self, rng: &mut LcgRng) -> GrownTree {
        let mut tree = FittedTree {
            feature: Vec::new(),
            threshold: Vec::new(),
            children_left: Vec::new(),
            children_right: Vec::new(),
            value: Vec::new(),
        };
        let mut impurity_decrease = vec![0.0; self.feature_count];

        let indices: Vec<usize> = (0..self.targets.len())
            .filter(|&i| self.weights[i] > 0.0)
            .collect();
        self.build_node(&indices, 0, &mut tree, &mut impurity_decrease, rng);

        GrownTree {
            tree,
            impurity_decrease,
        }
    }

    fn counts(&self, indices: &[usize]) -> [f64; 2] {
        let mut counts = [0.0, 0.0];
        for &i in indices {
            counts[self.targets[i] as usize] += self.weights[i];
        }
        counts
    }

    /// Recursively build tree nodes, returning the new node's index
    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        tree: &mut FittedTree,
        impurity_decrease: &mut [f64],
        rng: &mut LcgRng,
    ) -> usize {
        let current = tree.feature.len();
        let counts = self.counts(indices);
        let impurity = gini(counts);

        tree.feature.push(LEAF_FEATURE);
        tree.threshold.push(LEAF_FEATURE as f64);
        tree.children_left.push(LEAF_CHILD);
        tree.children_right.push(LEAF_CHILD);
        tree.value.push(counts);

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
            || impurity <= f64::EPSILON
        {
            return current;
        }

        let Some(split) = self.find_best_split(indices, counts, rng) else {
            return current;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.features[i][split.feature_idx] <= split.threshold);

        impurity_decrease[split.feature_idx] += split.gain;
        tree.feature[current] = split.feature_idx as i64;
        tree.threshold[current] = split.threshold;

        let left_idx = self.build_node(&left, depth + 1, tree, impurity_decrease, rng);
        let right_idx = self.build_node(&right, depth + 1, tree, impurity_decrease, rng);
        tree.children_left[current] = left_idx as i64;
        tree.children_right[current] = right_idx as i64;

        current
    }

    /// Best split over a random feature subset.
    ///
    /// Gain is the weighted impurity decrease. Ties keep the earlier
    /// candidate (draw order, then ascending threshold).
    fn find_best_split(
        &self,
        indices: &[usize],
        counts: [f64; 2],
        rng: &mut LcgRng,
    ) -> Option<SplitCandidate> {
        let total = counts[0] + counts[1];
        let parent = total * gini(counts);
        let k = self.config.max_features.resolve(self.feature_count);
        let mut best: Option<SplitCandidate> = None;

        for feature_idx in rng.sample_indices(self.feature_count, k) {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.features[a][feature_idx].total_cmp(&self.features[b][feature_idx])
            });

            let mut left = [0.0, 0.0];
            for pos in 0..sorted.len().saturating_sub(1) {
                let row = sorted[pos];
                left[self.targets[row] as usize] += self.weights[row];

                let value = self.features[row][feature_idx];
                let next = self.features[sorted[pos + 1]][feature_idx];
                if next <= value {
                    continue;
                }
                let n_left = pos + 1;
                if n_left < self.config.min_samples_leaf
                    || sorted.len() - n_left < self.config.min_samples_leaf
                {
                    continue;
                }

                let right = [counts[0] - left[0], counts[1] - left[1]];
                let children = (left[0] + left[1]) * gini(left) + (right[0] + right[1]) * gini(right);
                let gain = parent - children;
                if gain <= f64::EPSILON {
                    continue;
                }

                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }

                if best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}

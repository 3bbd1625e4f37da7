//! Training-side tree representation
//!
//! A fitted tree is stored as parallel node arrays, the layout tree learners
//! conventionally produce. Node 0 is the root. Leaves carry `LEAF_FEATURE`
//! as their feature and `LEAF_CHILD` as both children. `value[node]` holds
//! the `[negative, positive]` class counts of the training rows that reached
//! the node.
//!
//! This is the compiler's input. Nothing in the portable runtime depends on
//! it.

use serde::{Deserialize, Serialize};

/// Feature marker for leaf nodes
pub const LEAF_FEATURE: i64 = -2;
/// Child marker for leaf nodes
pub const LEAF_CHILD: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTree {
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub value: Vec<[f64; 2]>,
}

impl FittedTree {
    /// A tree consisting of a single leaf
    pub fn single_leaf(negative: f64, positive: f64) -> Self {
        Self {
            feature: vec![LEAF_FEATURE],
            threshold: vec![LEAF_FEATURE as f64],
            children_left: vec![LEAF_CHILD],
            children_right: vec![LEAF_CHILD],
            value: vec![[negative, positive]],
        }
    }

    pub fn node_count(&self) -> usize {
        self.feature.len()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.feature[node] == LEAF_FEATURE
    }

    /// Fraction of positive rows at `node`, `0` for an empty node
    pub fn positive_rate(&self, node: usize) -> f64 {
        let [negative, positive] = self.value[node];
        let total = negative + positive;
        if total > 0.0 {
            positive / total
        } else {
            0.0
        }
    }

    /// Node indices visited by `features`, root first, leaf last.
    ///
    /// Features past the end of the slice read as zero. Assumes a
    /// well-formed tree; compile it first to check.
    pub fn decision_path(&self, features: &[f64]) -> Vec<usize> {
        let mut path = vec![0usize];
        let mut node = 0usize;
        while !self.is_leaf(node) {
            let value = features.get(self.feature[node] as usize).copied().unwrap_or(0.0);
            node = if value <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
            path.push(node);
        }
        path
    }

    /// Leaf reached by `features`
    pub fn apply(&self, features: &[f64]) -> usize {
        self.decision_path(features).last().copied().unwrap_or(0)
    }

    /// Positive-class probability for `features`
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        self.positive_rate(self.apply(features))
    }
}

/// Fitted trees in training order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittedForest {
    pub trees: Vec<FittedTree>,
}

impl FittedForest {
    pub fn new(trees: Vec<FittedTree>) -> Self {
        Self { trees }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Mean positive-class probability over all trees
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(features)).sum();
        sum / self.trees.len() as f64
    }
}

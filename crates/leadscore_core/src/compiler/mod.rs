//! Tree-ensemble compiler
//!
//! Turns fitted node arrays into portable node tables keyed by feature name.
//! A compiled tree is plain data; the runtime's evaluator walks it with the
//! same rule the learner used: go left iff `features[feature] <= threshold`.
//!
//! # Format
//!
//! ```json
//! {"nodes":[
//!   {"kind":"split","feature":"Page Views","threshold":5.5,"left":1,"right":2},
//!   {"kind":"leaf","probability":0.25},
//!   {"kind":"leaf","probability":1.0}
//! ]}
//! ```

pub mod ensemble;
pub mod tree;

use serde::{Deserialize, Serialize};

pub use ensemble::compile_ensemble;
pub use tree::compile_tree;

/// A node of a compiled tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompiledNode {
    Split {
        feature: String,
        threshold: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        probability: f64,
    },
}

impl CompiledNode {
    pub fn split(feature: &str, threshold: f64, left: u32, right: u32) -> Self {
        Self::Split {
            feature: feature.to_string(),
            threshold,
            left,
            right,
        }
    }

    pub fn leaf(probability: f64) -> Self {
        Self::Leaf { probability }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// A compiled decision tree. Node 0 is the root, nodes are in pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTree {
    pub nodes: Vec<CompiledNode>,
}

impl CompiledTree {
    pub fn new(nodes: Vec<CompiledNode>) -> Self {
        Self { nodes }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf edge count
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[CompiledNode], idx: usize, budget: usize) -> usize {
            match nodes.get(idx) {
                Some(CompiledNode::Split { left, right, .. }) if budget > 0 => {
                    1 + walk(nodes, *left as usize, budget - 1)
                        .max(walk(nodes, *right as usize, budget - 1))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0, self.nodes.len())
    }
}

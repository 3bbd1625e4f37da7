//! Portable inference runtime
//!
//! Loads a compiled artifact, binds every split's feature name to its
//! vocabulary slot once, and scores leads by walking each tree from the
//! root. The runtime depends on nothing produced at training time beyond the
//! artifact itself.
//!
//! `PortableRuntime` reports failures; `ScoringEngine` is the adapter that
//! turns any failure (or a missing artifact) into a fallback score.

use crate::artifact::{EnsembleArtifact, ARTIFACT_FORMAT_VERSION};
use crate::compiler::CompiledNode;
use crate::encoder::{encode, EncodedVector};
use crate::errors::InferenceFailure;
use crate::explain::{heuristic, ExplanationResult};
use crate::fallback;
use crate::lead::RawLead;
use crate::signals::LeadSignals;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Node with its feature resolved to a vector index
#[derive(Debug, Clone, Copy, PartialEq)]
enum BoundNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone)]
struct BoundTree {
    nodes: Vec<BoundNode>,
}

impl BoundTree {
    fn bind(
        tree_idx: usize,
        nodes: &[CompiledNode],
        artifact: &EnsembleArtifact,
    ) -> Result<Self, InferenceFailure> {
        if nodes.is_empty() {
            return Err(InferenceFailure::Malformed(format!(
                "tree {tree_idx} has no nodes"
            )));
        }

        let count = nodes.len();
        let in_range = |child: u32, node: usize| {
            let child = child as usize;
            if child < count {
                Ok(child)
            } else {
                Err(InferenceFailure::Malformed(format!(
                    "tree {tree_idx} node {node} points to missing child {child}"
                )))
            }
        };

        let bound = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| match node {
                CompiledNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let slot = artifact.vocabulary.index_of(feature).ok_or_else(|| {
                        InferenceFailure::UnknownFeature {
                            tree: tree_idx,
                            node: idx,
                            feature: feature.clone(),
                        }
                    })?;
                    if !threshold.is_finite() {
                        return Err(InferenceFailure::Malformed(format!(
                            "tree {tree_idx} node {idx} has non-finite threshold"
                        )));
                    }
                    Ok(BoundNode::Split {
                        feature: slot,
                        threshold: *threshold,
                        left: in_range(*left, idx)?,
                        right: in_range(*right, idx)?,
                    })
                }
                CompiledNode::Leaf { probability } => {
                    if !(0.0..=1.0).contains(probability) {
                        return Err(InferenceFailure::Malformed(format!(
                            "tree {tree_idx} leaf {idx} has probability {probability} outside [0, 1]"
                        )));
                    }
                    Ok(BoundNode::Leaf(*probability))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { nodes: bound })
    }

    /// Leaf probability reached by `values`.
    ///
    /// A well-formed tree reaches a leaf in fewer steps than it has nodes;
    /// anything longer means the node table loops.
    fn evaluate(&self, tree_idx: usize, values: &[f64]) -> Result<f64, InferenceFailure> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes[idx] {
                BoundNode::Leaf(probability) => return Ok(probability),
                BoundNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if values[feature] <= threshold { left } else { right };
                }
            }
        }
        Err(InferenceFailure::TraversalLimit { tree: tree_idx })
    }
}

/// Scores leads against one compiled ensemble
#[derive(Debug, Clone)]
pub struct PortableRuntime {
    artifact: Arc<EnsembleArtifact>,
    trees: Vec<BoundTree>,
}

impl PortableRuntime {
    pub fn new(artifact: EnsembleArtifact) -> Result<Self, InferenceFailure> {
        Self::from_shared(Arc::new(artifact))
    }

    /// Validate and bind an artifact already shared with other owners
    pub fn from_shared(artifact: Arc<EnsembleArtifact>) -> Result<Self, InferenceFailure> {
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(InferenceFailure::UnsupportedVersion(artifact.format_version));
        }
        if artifact.vocabulary.is_empty() {
            return Err(InferenceFailure::Malformed("vocabulary is empty".to_string()));
        }
        if let Some(name) = artifact.vocabulary.unproduced_name() {
            return Err(InferenceFailure::Malformed(format!(
                "vocabulary entry `{name}` is not produced by any field"
            )));
        }
        if artifact.trees.is_empty() {
            return Err(InferenceFailure::Malformed(
                "artifact contains no trees".to_string(),
            ));
        }

        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(idx, tree)| BoundTree::bind(idx, &tree.nodes, &artifact))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            trees = trees.len(),
            features = artifact.vocabulary.len(),
            "runtime bound artifact"
        );
        Ok(Self { artifact, trees })
    }

    pub fn from_json(json: &str) -> Result<Self, InferenceFailure> {
        let artifact = EnsembleArtifact::from_json(json)
            .map_err(|e| InferenceFailure::Decode(e.to_string()))?;
        Self::new(artifact)
    }

    pub fn artifact(&self) -> &EnsembleArtifact {
        &self.artifact
    }

    /// Per-tree leaf probabilities, in tree order
    pub fn tree_probabilities(&self, vector: &EncodedVector<'_>) -> Result<Vec<f64>, InferenceFailure> {
        let values = vector.values();
        let expected = self.artifact.vocabulary.len();
        if values.len() != expected {
            return Err(InferenceFailure::VectorMismatch {
                expected,
                actual: values.len(),
            });
        }

        self.trees
            .iter()
            .enumerate()
            .map(|(idx, tree)| tree.evaluate(idx, values))
            .collect()
    }

    /// Mean leaf probability over every tree
    pub fn predict(&self, vector: &EncodedVector<'_>) -> Result<f64, InferenceFailure> {
        let probabilities = self.tree_probabilities(vector)?;
        let score = probabilities.iter().sum::<f64>() / probabilities.len() as f64;
        if score.is_finite() {
            Ok(score)
        } else {
            Err(InferenceFailure::NonFiniteScore)
        }
    }

    /// Encode, predict and attach the heuristic explanation
    pub fn try_score(&self, lead: &RawLead) -> Result<ExplanationResult, InferenceFailure> {
        let vector = encode(lead, &self.artifact.vocabulary);
        let score = self.predict(&vector)?;
        let explanation = heuristic::explain(&LeadSignals::from_lead(lead));
        Ok(ExplanationResult::new(score, explanation))
    }
}

/// Where a score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    Model,
    Fallback,
}

/// Always-answering scorer: the compiled model when it works, the fallback
/// rules otherwise.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    runtime: Option<PortableRuntime>,
}

impl ScoringEngine {
    pub fn new(runtime: PortableRuntime) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    pub fn without_model() -> Self {
        Self { runtime: None }
    }

    /// Build from serialized artifact text. An undecodable or invalid
    /// artifact leaves the engine in fallback mode.
    pub fn from_artifact_json(json: &str) -> Self {
        match PortableRuntime::from_json(json) {
            Ok(runtime) => Self::new(runtime),
            Err(failure) => {
                warn!(%failure, "artifact rejected, scoring with fallback rules");
                Self::without_model()
            }
        }
    }

    /// Load an artifact file. A missing or unreadable file leaves the engine
    /// in fallback mode.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => {
                info!(path = %path.display(), "loading compiled artifact");
                Self::from_artifact_json(&json)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "artifact unavailable, scoring with fallback rules");
                Self::without_model()
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn runtime(&self) -> Option<&PortableRuntime> {
        self.runtime.as_ref()
    }

    pub fn score(&self, lead: &RawLead) -> ExplanationResult {
        self.score_with_source(lead).0
    }

    pub fn score_with_source(&self, lead: &RawLead) -> (ExplanationResult, ScoreSource) {
        let attempt = match &self.runtime {
            Some(runtime) => runtime.try_score(lead),
            None => Err(InferenceFailure::NoArtifact),
        };

        match attempt {
            Ok(result) => (result, ScoreSource::Model),
            Err(failure) => {
                if self.runtime.is_some() {
                    warn!(%failure, "inference failed, scoring with fallback rules");
                } else {
                    debug!("no artifact loaded, scoring with fallback rules");
                }
                (fallback::score(lead), ScoreSource::Fallback)
            }
        }
    }
}

//! Lead scoring core
//!
//! Compiles fitted decision-tree ensembles into portable artifacts and
//! scores raw leads against them, with a rule-based fallback when no usable
//! model is available.
//!
//! Modules:
//! - `lead`: Raw lead records and value coercion
//! - `vocabulary`: Feature vocabulary derived from training columns
//! - `encoder`: Lead to feature-vector encoding shared by training and scoring
//! - `fitted`: Fitted tree arrays produced by the trainer
//! - `compiler`: Fitted trees to compiled node tables
//! - `artifact`: Portable ensemble artifact and its canonical form
//! - `runtime`: Artifact-backed inference and the fallback-substituting engine
//! - `explain`: Explanation types and the heuristic explainer
//! - `fallback`: Rule-based scorer
//! - `assessment`: Intent tier, insights and next action for sales
//! - `feedback`: Append-only feedback sink

pub mod artifact;
pub mod assessment;
pub mod compiler;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod explain;
pub mod fallback;
pub mod feedback;
pub mod fitted;
pub mod lead;
pub mod runtime;
pub mod serde_canon;
pub mod signals;
pub mod vocabulary;

pub use artifact::{EnsembleArtifact, ARTIFACT_FORMAT_VERSION};
pub use assessment::{IntentTier, LeadAssessment};
pub use compiler::{compile_ensemble, compile_tree, CompiledNode, CompiledTree};
pub use config::{ScoringConfig, TierThresholds};
pub use encoder::{encode, EncodedVector};
pub use errors::{CompileError, CoreError, InferenceFailure, TreeDefect};
pub use explain::{top_k_by_magnitude, ExplanationResult, FeatureImpact};
pub use feedback::{FeedbackRecord, FeedbackSink, JsonLinesFeedbackSink};
pub use fitted::{FittedForest, FittedTree};
pub use lead::RawLead;
pub use runtime::{PortableRuntime, ScoreSource, ScoringEngine};
pub use signals::LeadSignals;
pub use vocabulary::{FeatureVocabulary, FieldKind, FieldSpec, LeadSchema};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

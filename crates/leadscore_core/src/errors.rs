//! Error types for the scoring core

use crate::serde_canon::CanonicalError;
use thiserror::Error;

/// Errors raised by configuration, persistence and serialization helpers
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Canonical JSON error
    #[error("Canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),
}

/// A defect found while compiling one fitted tree.
///
/// Node indices refer to the fitted tree's own arrays.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeDefect {
    #[error("tree has no nodes")]
    Empty,

    #[error("array `{array}` has {actual} entries, expected {expected}")]
    ShapeMismatch {
        array: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("node {node} points to missing child {child}")]
    DanglingChild { node: usize, child: i64 },

    #[error("node {node} is reachable more than once")]
    Cycle { node: usize },

    #[error("node {node} splits on feature index {feature} outside the vocabulary")]
    UnknownFeature { node: usize, feature: i64 },

    #[error("node {node} has non-finite threshold")]
    NonFiniteThreshold { node: usize },

    #[error("leaf {node} has invalid class counts")]
    InvalidCounts { node: usize },
}

/// Fatal compilation failure. A well-formed ensemble never produces one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("ensemble contains no trees")]
    EmptyEnsemble,

    #[error("vocabulary is empty")]
    EmptyVocabulary,

    #[error("vocabulary entry `{0}` is not produced by any field")]
    UnproducedFeature(String),

    #[error("tree {tree} is malformed: {defect}")]
    MalformedTree {
        tree: usize,
        #[source]
        defect: TreeDefect,
    },
}

/// Failure of the portable runtime. Callers substitute the fallback scorer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceFailure {
    #[error("no compiled artifact is loaded")]
    NoArtifact,

    #[error("artifact could not be decoded: {0}")]
    Decode(String),

    #[error("unsupported artifact format version {0}")]
    UnsupportedVersion(u32),

    #[error("artifact is malformed: {0}")]
    Malformed(String),

    #[error("tree {tree} node {node} references unknown feature `{feature}`")]
    UnknownFeature {
        tree: usize,
        node: usize,
        feature: String,
    },

    #[error("tree {tree} did not reach a leaf")]
    TraversalLimit { tree: usize },

    #[error("encoded vector has {actual} values, vocabulary has {expected}")]
    VectorMismatch { expected: usize, actual: usize },

    #[error("ensemble produced a non-finite score")]
    NonFiniteScore,
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

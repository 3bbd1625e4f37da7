//! Portable ensemble artifact
//!
//! The artifact is the single unit shipped to the scoring side: vocabulary,
//! field schema and compiled trees, with no reference to any training-time
//! object. It is stored as canonical JSON so identical models hash
//! identically.

use crate::compiler::CompiledTree;
use crate::errors::Result;
use crate::serde_canon::{hash_canonical_hex, to_canonical_json, CanonicalError};
use crate::vocabulary::FeatureVocabulary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current artifact layout version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleArtifact {
    pub format_version: u32,
    pub vocabulary: FeatureVocabulary,
    pub trees: Vec<CompiledTree>,
}

impl EnsembleArtifact {
    pub fn new(vocabulary: FeatureVocabulary, trees: Vec<CompiledTree>) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            vocabulary,
            trees,
        }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn node_count(&self) -> usize {
        self.trees.iter().map(CompiledTree::node_count).sum()
    }

    pub fn to_canonical_json(&self) -> std::result::Result<String, CanonicalError> {
        to_canonical_json(self)
    }

    /// Blake3 digest of the canonical JSON form
    pub fn hash_hex(&self) -> std::result::Result<String, CanonicalError> {
        hash_canonical_hex(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_canonical_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompiledNode;
    use crate::vocabulary::{FieldKind, FieldSpec};

    fn artifact() -> EnsembleArtifact {
        let vocabulary = FeatureVocabulary::new(
            vec!["Page Views".to_string(), "Downloads".to_string()],
            vec![
                FieldSpec::new("Page Views", FieldKind::Numeric, &["pageViews"]),
                FieldSpec::new("Downloads", FieldKind::Numeric, &["downloads"]),
            ],
        );
        let tree = CompiledTree::new(vec![
            CompiledNode::split("Page Views", 5.5, 1, 2),
            CompiledNode::leaf(0.25),
            CompiledNode::leaf(1.0 / 3.0),
        ]);
        EnsembleArtifact::new(vocabulary, vec![tree, CompiledTree::new(vec![CompiledNode::leaf(0.75)])])
    }

    #[test]
    fn test_counts() {
        let artifact = artifact();
        assert_eq!(artifact.tree_count(), 2);
        assert_eq!(artifact.node_count(), 4);
        assert_eq!(artifact.format_version, ARTIFACT_FORMAT_VERSION);
    }

    #[test]
    fn test_canonical_json_roundtrip() {
        let original = artifact();
        let json = original.to_canonical_json().unwrap();
        let restored = EnsembleArtifact::from_json(&json).unwrap();

        assert_eq!(original, restored);
        assert_eq!(original.hash_hex().unwrap(), restored.hash_hex().unwrap());
        assert!(!json.contains('\n'));
        assert!(json.contains(r#""kind":"split""#));
    }

    #[test]
    fn test_save_load_json() {
        let original = artifact();
        let file = tempfile::NamedTempFile::new().unwrap();

        original.save_json(file.path()).unwrap();
        let loaded = EnsembleArtifact::load_json(file.path()).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = artifact();
        let mut b = artifact();
        b.trees.pop();
        assert_ne!(a.hash_hex().unwrap(), b.hash_hex().unwrap());
    }
}

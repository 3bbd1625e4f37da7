//! Whole-ensemble compilation

use super::tree::compile_tree;
use crate::artifact::EnsembleArtifact;
use crate::errors::CompileError;
use crate::fitted::FittedForest;
use crate::vocabulary::FeatureVocabulary;
use tracing::{error, info};

/// Compile every tree of `forest` and package them with `vocabulary`.
///
/// Tree count and order are preserved. Any malformed tree aborts the whole
/// compilation.
pub fn compile_ensemble(
    forest: &FittedForest,
    vocabulary: &FeatureVocabulary,
) -> Result<EnsembleArtifact, CompileError> {
    if forest.is_empty() {
        error!("refusing to compile an empty ensemble");
        return Err(CompileError::EmptyEnsemble);
    }
    if vocabulary.is_empty() {
        error!("refusing to compile against an empty vocabulary");
        return Err(CompileError::EmptyVocabulary);
    }
    if let Some(name) = vocabulary.unproduced_name() {
        error!(feature = %name, "vocabulary entry has no source field");
        return Err(CompileError::UnproducedFeature(name.to_string()));
    }

    let trees = forest
        .trees
        .iter()
        .enumerate()
        .map(|(idx, tree)| {
            compile_tree(tree, vocabulary).map_err(|defect| {
                error!(tree = idx, %defect, "tree compilation failed");
                CompileError::MalformedTree { tree: idx, defect }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let artifact = EnsembleArtifact::new(vocabulary.clone(), trees);
    info!(
        trees = artifact.tree_count(),
        nodes = artifact.node_count(),
        features = vocabulary.len(),
        "compiled ensemble"
    );
    Ok(artifact)
}

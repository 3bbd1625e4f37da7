//! Single-tree compilation

use super::{CompiledNode, CompiledTree};
use crate::errors::TreeDefect;
use crate::fitted::{FittedTree, LEAF_FEATURE};
use crate::vocabulary::FeatureVocabulary;

/// Compile one fitted tree into a node table over vocabulary names.
///
/// Descends from the root, emitting nodes in pre-order (left subtree before
/// right). Thresholds are copied bit-for-bit. A leaf's probability is
/// `positive / (positive + negative)`, or `0` when no rows reached it.
pub fn compile_tree(
    tree: &FittedTree,
    vocabulary: &FeatureVocabulary,
) -> Result<CompiledTree, TreeDefect> {
    check_shape(tree)?;

    let count = tree.node_count();
    let mut visited = vec![false; count];
    let mut nodes: Vec<CompiledNode> = Vec::with_capacity(count);
    // (fitted node, compiled parent and whether we are its left child)
    let mut stack: Vec<(usize, Option<(usize, bool)>)> = vec![(0, None)];

    while let Some((node, parent)) = stack.pop() {
        if visited[node] {
            return Err(TreeDefect::Cycle { node });
        }
        visited[node] = true;

        let slot = nodes.len();
        if let Some((parent_slot, is_left)) = parent {
            if let CompiledNode::Split { left, right, .. } = &mut nodes[parent_slot] {
                if is_left {
                    *left = slot as u32;
                } else {
                    *right = slot as u32;
                }
            }
        }

        if tree.feature[node] == LEAF_FEATURE {
            nodes.push(CompiledNode::leaf(leaf_probability(tree, node)?));
            continue;
        }

        let feature = usize::try_from(tree.feature[node])
            .ok()
            .and_then(|idx| vocabulary.name(idx))
            .ok_or(TreeDefect::UnknownFeature {
                node,
                feature: tree.feature[node],
            })?;

        let threshold = tree.threshold[node];
        if !threshold.is_finite() {
            return Err(TreeDefect::NonFiniteThreshold { node });
        }

        let left = child(tree.children_left[node], node, count)?;
        let right = child(tree.children_right[node], node, count)?;

        nodes.push(CompiledNode::split(feature, threshold, 0, 0));
        stack.push((right, Some((slot, false))));
        stack.push((left, Some((slot, true))));
    }

    Ok(CompiledTree::new(nodes))
}

fn check_shape(tree: &FittedTree) -> Result<(), TreeDefect> {
    let expected = tree.feature.len();
    if expected == 0 {
        return Err(TreeDefect::Empty);
    }

    let lengths = [
        ("threshold", tree.threshold.len()),
        ("children_left", tree.children_left.len()),
        ("children_right", tree.children_right.len()),
        ("value", tree.value.len()),
    ];
    for (array, actual) in lengths {
        if actual != expected {
            return Err(TreeDefect::ShapeMismatch {
                array,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

fn child(index: i64, node: usize, count: usize) -> Result<usize, TreeDefect> {
    usize::try_from(index)
        .ok()
        .filter(|&c| c < count)
        .ok_or(TreeDefect::DanglingChild { node, child: index })
}

fn leaf_probability(tree: &FittedTree, node: usize) -> Result<f64, TreeDefect> {
    let [negative, positive] = tree.value[node];
    let valid = |v: f64| v.is_finite() && v >= 0.0;
    if !valid(negative) || !valid(positive) {
        return Err(TreeDefect::InvalidCounts { node });
    }
    Ok(tree.positive_rate(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitted::LEAF_CHILD;

    fn vocabulary() -> FeatureVocabulary {
        FeatureVocabulary::new(
            vec!["Page Views".to_string(), "Downloads".to_string()],
            vec![],
        )
    }

    /// Fitted layout where the right subtree is stored before the left one
    fn out_of_order_tree() -> FittedTree {
        // 0: Page Views <= 5.5 -> left 3, right 1
        // 1: Downloads <= 0.5 -> left 2, right 4
        FittedTree {
            feature: vec![0, 1, LEAF_FEATURE, LEAF_FEATURE, LEAF_FEATURE],
            threshold: vec![5.5, 0.5, -2.0, -2.0, -2.0],
            children_left: vec![3, 2, LEAF_CHILD, LEAF_CHILD, LEAF_CHILD],
            children_right: vec![1, 4, LEAF_CHILD, LEAF_CHILD, LEAF_CHILD],
            value: vec![[5.0, 5.0], [1.0, 4.0], [1.0, 1.0], [4.0, 1.0], [0.0, 3.0]],
        }
    }

    #[test]
    fn test_single_leaf_tree() {
        let tree = FittedTree::single_leaf(1.0, 3.0);
        let compiled = compile_tree(&tree, &vocabulary()).unwrap();
        assert_eq!(compiled.nodes, vec![CompiledNode::leaf(0.75)]);
    }

    #[test]
    fn test_empty_leaf_compiles_to_zero() {
        let tree = FittedTree::single_leaf(0.0, 0.0);
        let compiled = compile_tree(&tree, &vocabulary()).unwrap();
        assert_eq!(compiled.nodes, vec![CompiledNode::leaf(0.0)]);
    }

    #[test]
    fn test_preorder_renumbering() {
        let compiled = compile_tree(&out_of_order_tree(), &vocabulary()).unwrap();

        assert_eq!(
            compiled.nodes,
            vec![
                CompiledNode::split("Page Views", 5.5, 1, 2),
                CompiledNode::leaf(0.2),
                CompiledNode::split("Downloads", 0.5, 3, 4),
                CompiledNode::leaf(0.5),
                CompiledNode::leaf(1.0),
            ]
        );
        assert_eq!(compiled.depth(), 2);
        assert_eq!(compiled.leaf_count(), 3);
    }

    #[test]
    fn test_threshold_bits_preserved() {
        let mut tree = out_of_order_tree();
        tree.threshold[0] = 5.500000000000001;
        let compiled = compile_tree(&tree, &vocabulary()).unwrap();

        match &compiled.nodes[0] {
            CompiledNode::Split { threshold, .. } => {
                assert_eq!(threshold.to_bits(), 5.500000000000001f64.to_bits())
            }
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn test_dangling_child_rejected() {
        let mut tree = out_of_order_tree();
        tree.children_right[1] = 9;
        assert_eq!(
            compile_tree(&tree, &vocabulary()),
            Err(TreeDefect::DanglingChild { node: 1, child: 9 })
        );

        tree.children_right[1] = LEAF_CHILD;
        assert!(matches!(
            compile_tree(&tree, &vocabulary()),
            Err(TreeDefect::DanglingChild { node: 1, child: -1 })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = out_of_order_tree();
        tree.children_right[1] = 0;
        assert!(matches!(
            compile_tree(&tree, &vocabulary()),
            Err(TreeDefect::Cycle { .. })
        ));
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let mut tree = out_of_order_tree();
        tree.feature[1] = 7;
        assert_eq!(
            compile_tree(&tree, &vocabulary()),
            Err(TreeDefect::UnknownFeature { node: 1, feature: 7 })
        );
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut tree = out_of_order_tree();
        tree.value.pop();
        assert_eq!(
            compile_tree(&tree, &vocabulary()),
            Err(TreeDefect::ShapeMismatch {
                array: "value",
                expected: 5,
                actual: 4
            })
        );
    }

    #[test]
    fn test_invalid_counts_rejected() {
        let mut tree = FittedTree::single_leaf(1.0, 1.0);
        tree.value[0] = [f64::NAN, 1.0];
        assert_eq!(
            compile_tree(&tree, &vocabulary()),
            Err(TreeDefect::InvalidCounts { node: 0 })
        );
    }

    #[test]
    fn test_empty_tree_rejected() {
        let tree = FittedTree {
            feature: vec![],
            threshold: vec![],
            children_left: vec![],
            children_right: vec![],
            value: vec![],
        };
        assert_eq!(compile_tree(&tree, &vocabulary()), Err(TreeDefect::Empty));
    }
}

//! Exact TreeSHAP attribution
//!
//! Path-dependent TreeSHAP (Lundberg et al., 2020) over the fitted forest.
//! Node covers are the training class counts, leaf values the positive
//! rates. Features absent from a coalition follow both children weighted by
//! cover, so the per-tree values sum to the tree's prediction minus its
//! cover-weighted expectation. Averaged over the forest they sum to
//! `score - baseline`.

use leadscore_core::{
    compile_ensemble, encode, top_k_by_magnitude, CompileError, ExplanationResult, FeatureImpact,
    FeatureVocabulary, FittedForest, FittedTree, InferenceFailure, RawLead,
};

/// Full attribution of one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    /// Mean expected tree output over the forest
    pub baseline: f64,
    pub score: f64,
    /// One SHAP value per vocabulary feature, in vocabulary order
    pub contributions: Vec<f64>,
}

impl Attribution {
    pub fn total(&self) -> f64 {
        self.contributions.iter().sum()
    }
}

#[derive(Clone, Copy, Debug)]
struct PathElement {
    /// `None` for the root placeholder
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

/// Unique split features on the current root-to-node path with their
/// permutation weights
#[derive(Clone, Debug, Default)]
struct PathState {
    elements: Vec<PathElement>,
}

impl PathState {
    fn depth(&self) -> usize {
        self.elements.len().saturating_sub(1)
    }

    fn position(&self, feature: usize) -> Option<usize> {
        self.elements.iter().position(|e| e.feature == Some(feature))
    }

    fn extend(&mut self, feature: Option<usize>, zero_fraction: f64, one_fraction: f64) {
        let depth = self.elements.len();
        self.elements.push(PathElement {
            feature,
            zero_fraction,
            one_fraction,
            weight: if depth == 0 { 1.0 } else { 0.0 },
        });

        let scale = (depth + 1) as f64;
        for i in (0..depth).rev() {
            let carried = one_fraction * self.elements[i].weight * (i + 1) as f64 / scale;
            self.elements[i + 1].weight += carried;
            self.elements[i].weight = zero_fraction * self.elements[i].weight * (depth - i) as f64 / scale;
        }
    }

    /// Remove element `index`, undoing its effect on the weights
    fn unwind(&mut self, index: usize) {
        let depth = self.depth();
        let PathElement {
            zero_fraction,
            one_fraction,
            ..
        } = self.elements[index];
        let scale = (depth + 1) as f64;

        let mut next_one = self.elements[depth].weight;
        for i in (0..depth).rev() {
            if one_fraction != 0.0 {
                let previous = self.elements[i].weight;
                self.elements[i].weight = next_one * scale / ((i + 1) as f64 * one_fraction);
                next_one = previous - self.elements[i].weight * zero_fraction * (depth - i) as f64 / scale;
            } else {
                self.elements[i].weight =
                    self.elements[i].weight * scale / (zero_fraction * (depth - i) as f64);
            }
        }

        for i in index..depth {
            let next = self.elements[i + 1];
            let element = &mut self.elements[i];
            element.feature = next.feature;
            element.zero_fraction = next.zero_fraction;
            element.one_fraction = next.one_fraction;
        }
        self.elements.pop();
    }

    /// Total weight of the path with element `index` unwound
    fn unwound_sum(&self, index: usize) -> f64 {
        let depth = self.depth();
        let PathElement {
            zero_fraction,
            one_fraction,
            ..
        } = self.elements[index];
        let scale = (depth + 1) as f64;

        let mut next_one = self.elements[depth].weight;
        let mut total = 0.0;
        for i in (0..depth).rev() {
            if one_fraction != 0.0 {
                let share = next_one * scale / ((i + 1) as f64 * one_fraction);
                total += share;
                next_one = self.elements[i].weight - share * zero_fraction * (depth - i) as f64 / scale;
            } else if zero_fraction != 0.0 {
                total += self.elements[i].weight / zero_fraction / ((depth - i) as f64 / scale);
            }
        }
        total
    }
}

fn cover(tree: &FittedTree, node: usize) -> f64 {
    let [negative, positive] = tree.value[node];
    negative + positive
}

/// Cover fractions of the two children, even when both are empty
fn child_fractions(tree: &FittedTree, left: usize, right: usize) -> (f64, f64) {
    let (l, r) = (cover(tree, left), cover(tree, right));
    if l + r > 0.0 {
        (l / (l + r), r / (l + r))
    } else {
        (0.5, 0.5)
    }
}

fn children(tree: &FittedTree, node: usize) -> (usize, usize) {
    (
        tree.children_left[node] as usize,
        tree.children_right[node] as usize,
    )
}

/// Cover-weighted mean leaf value below `node`
fn expected_value(tree: &FittedTree, node: usize) -> f64 {
    if tree.is_leaf(node) {
        return tree.positive_rate(node);
    }
    let (left, right) = children(tree, node);
    let (l, r) = child_fractions(tree, left, right);
    l * expected_value(tree, left) + r * expected_value(tree, right)
}

#[allow(clippy::too_many_arguments)]
fn tree_shap(
    tree: &FittedTree,
    values: &[f64],
    node: usize,
    mut path: PathState,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
    phi: &mut [f64],
) {
    // Every weight below would be zero
    if zero_fraction == 0.0 && one_fraction == 0.0 {
        return;
    }
    path.extend(feature, zero_fraction, one_fraction);

    if tree.is_leaf(node) {
        let leaf = tree.positive_rate(node);
        for i in 1..=path.depth() {
            let element = path.elements[i];
            if let Some(f) = element.feature {
                phi[f] += path.unwound_sum(i) * (element.one_fraction - element.zero_fraction) * leaf;
            }
        }
        return;
    }

    let split = tree.feature[node] as usize;
    let (left, right) = children(tree, node);
    let (left_fraction, right_fraction) = child_fractions(tree, left, right);
    let (hot, hot_fraction, cold, cold_fraction) = if values[split] <= tree.threshold[node] {
        (left, left_fraction, right, right_fraction)
    } else {
        (right, right_fraction, left, left_fraction)
    };

    let (mut incoming_zero, mut incoming_one) = (1.0, 1.0);
    if let Some(index) = path.position(split) {
        incoming_zero = path.elements[index].zero_fraction;
        incoming_one = path.elements[index].one_fraction;
        path.unwind(index);
    }

    tree_shap(
        tree,
        values,
        hot,
        path.clone(),
        hot_fraction * incoming_zero,
        incoming_one,
        Some(split),
        phi,
    );
    tree_shap(
        tree,
        values,
        cold,
        path,
        cold_fraction * incoming_zero,
        0.0,
        Some(split),
        phi,
    );
}

/// Explains predictions of a fitted forest from its own node statistics
pub struct ExactExplainer<'a> {
    forest: &'a FittedForest,
    vocabulary: &'a FeatureVocabulary,
    top_k: usize,
}

impl<'a> ExactExplainer<'a> {
    /// The forest must compile against `vocabulary`; that check guarantees
    /// every walk stays in bounds for vocabulary-sized vectors.
    pub fn new(
        forest: &'a FittedForest,
        vocabulary: &'a FeatureVocabulary,
        top_k: usize,
    ) -> Result<Self, CompileError> {
        compile_ensemble(forest, vocabulary)?;
        Ok(Self {
            forest,
            vocabulary,
            top_k,
        })
    }

    /// Attribution for an already encoded vector
    pub fn attribute(&self, values: &[f64]) -> Result<Attribution, InferenceFailure> {
        if values.len() != self.vocabulary.len() {
            return Err(InferenceFailure::VectorMismatch {
                expected: self.vocabulary.len(),
                actual: values.len(),
            });
        }
        Ok(self.attribute_aligned(values))
    }

    fn attribute_aligned(&self, values: &[f64]) -> Attribution {
        let mut contributions = vec![0.0; self.vocabulary.len()];
        let mut baseline = 0.0;
        let mut score = 0.0;

        for tree in &self.forest.trees {
            tree_shap(tree, values, 0, PathState::default(), 1.0, 1.0, None, &mut contributions);
            baseline += expected_value(tree, 0);
            score += tree.predict_proba(values);
        }

        let n = self.forest.len() as f64;
        contributions.iter_mut().for_each(|c| *c /= n);
        Attribution {
            baseline: baseline / n,
            score: score / n,
            contributions,
        }
    }

    /// Score a lead and keep its `top_k` strongest contributions
    pub fn explain(&self, lead: &RawLead) -> ExplanationResult {
        let vector = encode(lead, self.vocabulary);
        let attribution = self.attribute_aligned(vector.values());

        let impacts = self
            .vocabulary
            .names()
            .iter()
            .zip(&attribution.contributions)
            .map(|(name, &impact)| FeatureImpact::new(name.as_str(), impact))
            .collect();

        ExplanationResult::new(attribution.score, top_k_by_magnitude(impacts, self.top_k))
    }
}

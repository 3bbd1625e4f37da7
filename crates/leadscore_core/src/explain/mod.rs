//! Score explanations
//!
//! Every producer (heuristic table, fallback rules, exact attribution in the
//! trainer) fills the same `ExplanationResult` shape.

pub mod heuristic;

use serde::{Deserialize, Serialize};

/// Contribution of one feature or signal to a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImpact {
    pub feature: String,
    pub impact: f64,
}

impl FeatureImpact {
    pub fn new(feature: impl Into<String>, impact: f64) -> Self {
        Self {
            feature: feature.into(),
            impact,
        }
    }
}

/// Scoring response: probability of conversion plus ranked drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub score: f64,
    pub explanation: Vec<FeatureImpact>,
}

impl ExplanationResult {
    pub fn new(score: f64, explanation: Vec<FeatureImpact>) -> Self {
        Self { score, explanation }
    }

    /// Entries that pushed the score up
    pub fn positive_drivers(&self) -> impl Iterator<Item = &FeatureImpact> {
        self.explanation.iter().filter(|e| e.impact > 0.0)
    }
}

/// Keep the `k` entries with the largest absolute impact.
///
/// `impacts` must be in vocabulary order; the sort is stable so ties keep
/// that order.
pub fn top_k_by_magnitude(mut impacts: Vec<FeatureImpact>, k: usize) -> Vec<FeatureImpact> {
    impacts.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    impacts.truncate(k);
    impacts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_orders_by_magnitude() {
        let impacts = vec![
            FeatureImpact::new("a", 0.01),
            FeatureImpact::new("b", -0.3),
            FeatureImpact::new("c", 0.2),
            FeatureImpact::new("d", 0.0),
        ];

        let top = top_k_by_magnitude(impacts, 2);
        let names: Vec<&str> = top.iter().map(|i| i.feature.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_top_k_ties_keep_input_order() {
        let impacts = vec![
            FeatureImpact::new("first", 0.1),
            FeatureImpact::new("second", -0.1),
            FeatureImpact::new("third", 0.1),
        ];

        let top = top_k_by_magnitude(impacts, 5);
        let names: Vec<&str> = top.iter().map(|i| i.feature.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_response_shape() {
        let result = ExplanationResult::new(0.5, vec![FeatureImpact::new("Downloads", 0.1)]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"score": 0.5, "explanation": [{"feature": "Downloads", "impact": 0.1}]})
        );
    }
}

//! Lead encoding against a fixed vocabulary
//!
//! The same function encodes training rows and live leads, so the portable
//! runtime reproduces the exact numeric input the trees were fitted on.

use crate::lead::RawLead;
use crate::vocabulary::{FieldKind, FeatureVocabulary};

/// One value per vocabulary entry, in vocabulary order
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVector<'v> {
    vocabulary: &'v FeatureVocabulary,
    values: Vec<f64>,
}

impl<'v> EncodedVector<'v> {
    /// All-zero vector for `vocabulary`
    pub fn zeros(vocabulary: &'v FeatureVocabulary) -> Self {
        Self {
            vocabulary,
            values: vec![0.0; vocabulary.len()],
        }
    }

    /// Wrap precomputed values. Returns `None` when the length is wrong.
    pub fn from_values(vocabulary: &'v FeatureVocabulary, values: Vec<f64>) -> Option<Self> {
        (values.len() == vocabulary.len()).then_some(Self { vocabulary, values })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.vocabulary.index_of(name).map(|i| self.values[i])
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn vocabulary(&self) -> &'v FeatureVocabulary {
        self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(name, value)` pairs in vocabulary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.vocabulary
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    fn set(&mut self, name: &str, value: f64) {
        if let Some(i) = self.vocabulary.index_of(name) {
            self.values[i] = value;
        }
    }
}

/// Encode `lead` into a vector aligned with `vocabulary`.
///
/// Unknown lead fields are ignored, unknown categories leave every
/// indicator of their field at zero, unreadable numbers become zero.
pub fn encode<'v>(lead: &RawLead, vocabulary: &'v FeatureVocabulary) -> EncodedVector<'v> {
    let mut vector = EncodedVector::zeros(vocabulary);

    for field in vocabulary.fields() {
        let keys = field.lookup_keys();
        match field.kind {
            FieldKind::Numeric => vector.set(&field.name, lead.number(&keys)),
            FieldKind::Flag => {
                let value = if lead.flag(&keys) { 1.0 } else { 0.0 };
                vector.set(&field.name, value);
            }
            FieldKind::Categorical => {
                if let Some(category) = lead.text(&keys) {
                    vector.set(&field.indicator(&category), 1.0);
                }
            }
        }
    }

    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::LeadSchema;
    use serde_json::json;

    fn vocabulary() -> FeatureVocabulary {
        let header: Vec<String> = ["Title", "Company Size", "Page Views", "Downloads", "Webinar Attended"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<Vec<String>> = [
            ["CTO", "Enterprise", "12", "3", "1"],
            ["Analyst", "Mid-Market", "2", "0", "0"],
        ]
        .iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect();
        FeatureVocabulary::derive(&header, &rows, &LeadSchema::standard())
    }

    #[test]
    fn test_encode_full_lead() {
        let vocab = vocabulary();
        let lead = RawLead::from_value(json!({
            "title": "CTO",
            "companySize": "Enterprise",
            "pageViews": 15,
            "Downloads": "2",
            "webinarAttended": true,
            "favouriteColour": "green"
        }));

        let vector = encode(&lead, &vocab);
        assert_eq!(vector.len(), vocab.len());
        assert_eq!(vector.get("Page Views"), Some(15.0));
        assert_eq!(vector.get("Downloads"), Some(2.0));
        assert_eq!(vector.get("Webinar Attended"), Some(1.0));
        assert_eq!(vector.get("Title_CTO"), Some(1.0));
        assert_eq!(vector.get("Title_Analyst"), Some(0.0));
        assert_eq!(vector.get("Company Size_Enterprise"), Some(1.0));
        assert_eq!(vector.get("favouriteColour"), None);
    }

    #[test]
    fn test_unknown_category_sets_nothing() {
        let vocab = vocabulary();
        let lead = RawLead::from_value(json!({"Title": "Astronaut", "Company Size": "Galactic"}));

        let vector = encode(&lead, &vocab);
        for (name, value) in vector.iter() {
            if name.starts_with("Title_") || name.starts_with("Company Size_") {
                assert_eq!(value, 0.0, "{name} should stay zero");
            }
        }
    }

    #[test]
    fn test_empty_lead_is_all_zero() {
        let vocab = vocabulary();
        let vector = encode(&RawLead::new(), &vocab);
        assert!(vector.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_malformed_values_degrade() {
        let vocab = vocabulary();
        let lead = RawLead::from_value(json!({
            "pageViews": "many",
            "downloads": {"nested": 1},
            "webinarAttended": "maybe"
        }));

        let vector = encode(&lead, &vocab);
        assert_eq!(vector.get("Page Views"), Some(0.0));
        assert_eq!(vector.get("Downloads"), Some(0.0));
        assert_eq!(vector.get("Webinar Attended"), Some(0.0));
    }

    #[test]
    fn test_request_keys_take_precedence() {
        let vocab = vocabulary();
        let lead = RawLead::from_value(json!({
            "title": "CTO",
            "Title": "Analyst",
            "pageViews": 15,
            "Page Views": 1
        }));

        let vector = encode(&lead, &vocab);
        assert_eq!(vector.get("Title_CTO"), Some(1.0));
        assert_eq!(vector.get("Title_Analyst"), Some(0.0));
        assert_eq!(vector.get("Page Views"), Some(15.0));
    }

    #[test]
    fn test_training_row_and_live_lead_agree() {
        let vocab = vocabulary();
        let row = RawLead::from_columns([
            ("Title", "CTO"),
            ("Company Size", "Enterprise"),
            ("Page Views", "12"),
            ("Downloads", "3"),
            ("Webinar Attended", "1"),
        ]);
        let live = RawLead::from_value(json!({
            "title": "CTO",
            "companySize": "Enterprise",
            "pageViews": 12,
            "downloads": 3,
            "webinarAttended": true
        }));

        assert_eq!(encode(&row, &vocab).values(), encode(&live, &vocab).values());
    }
}

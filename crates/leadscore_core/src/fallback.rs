//! Rule-based scorer used when no compiled model is usable.
//!
//! Total over every input: non-finite or missing values count as zero and the
//! score is clamped, so this path cannot fail.

use crate::explain::heuristic::{
    company_size_impact, downloads_impact, page_views_impact, COMPANY_SIZE, DOWNLOADS, INDUSTRY,
    PAGE_VIEWS,
};
use crate::explain::{ExplanationResult, FeatureImpact};
use crate::lead::RawLead;
use crate::signals::LeadSignals;

pub const BASE_SCORE: f64 = 0.3;
pub const WEBINAR_BONUS: f64 = 0.15;
pub const INDUSTRY_BONUS: f64 = 0.1;
pub const SENIOR_TITLE_BONUS: f64 = 0.1;

/// Reported under a different label than the heuristic explainer uses.
pub const WEBINAR_ATTENDANCE: &str = "Webinar Attendance";

pub fn score(lead: &RawLead) -> ExplanationResult {
    score_signals(&LeadSignals::from_lead(lead))
}

pub fn score_signals(signals: &LeadSignals) -> ExplanationResult {
    let page_views = page_views_impact(signals.page_views);
    let downloads = downloads_impact(signals.downloads);
    let webinar = if signals.webinar_attended {
        WEBINAR_BONUS
    } else {
        0.0
    };
    let company_size = company_size_impact(signals.size_tier());
    let industry = if signals.high_value_industry() {
        INDUSTRY_BONUS
    } else {
        0.0
    };
    let title = if signals.senior_title() {
        SENIOR_TITLE_BONUS
    } else {
        0.0
    };

    let raw = BASE_SCORE + page_views + downloads + webinar + company_size + industry + title;

    ExplanationResult::new(
        raw.min(1.0),
        vec![
            FeatureImpact::new(PAGE_VIEWS, page_views),
            FeatureImpact::new(DOWNLOADS, downloads),
            FeatureImpact::new(WEBINAR_ATTENDANCE, webinar),
            FeatureImpact::new(COMPANY_SIZE, company_size),
            FeatureImpact::new(INDUSTRY, industry),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_strong_lead_clamps_to_one() {
        let lead = RawLead::from_value(json!({
            "pageViews": 15,
            "downloads": 3,
            "webinarAttended": true,
            "companySize": "Enterprise",
            "industry": "Technology",
            "title": "CTO"
        }));

        let result = score(&lead);
        assert_eq!(result.score, 1.0);
        let impacts: Vec<f64> = result.explanation.iter().map(|e| e.impact).collect();
        assert_eq!(impacts, vec![0.2, 0.2, 0.15, 0.1, 0.1]);
    }

    #[test]
    fn test_empty_lead_scores_base() {
        let result = score(&RawLead::new());
        assert_eq!(result.score, 0.3);
        assert_eq!(result.explanation.len(), 5);
        assert!(result.explanation.iter().all(|e| e.impact == 0.0));
    }

    #[test]
    fn test_explanation_labels() {
        let names: Vec<String> = score(&RawLead::new())
            .explanation
            .into_iter()
            .map(|e| e.feature)
            .collect();
        assert_eq!(
            names,
            vec![
                "Page Views",
                "Downloads",
                "Webinar Attendance",
                "Company Size",
                "Industry"
            ]
        );
    }

    #[test]
    fn test_title_bonus_not_reported() {
        let lead = RawLead::from_value(json!({"Title": "Marketing Manager"}));
        let result = score(&lead);
        assert!((result.score - 0.4).abs() < 1e-12);
        assert!(result.explanation.iter().all(|e| e.impact == 0.0));
    }

    #[test]
    fn test_camel_case_keys_win_over_columns() {
        let title = RawLead::from_value(json!({"title": "CTO", "Title": "Intern"}));
        assert!((score(&title).score - 0.4).abs() < 1e-12);

        let views = RawLead::from_value(json!({"pageViews": 15, "Page Views": 1}));
        let result = score(&views);
        assert!((result.score - 0.5).abs() < 1e-12);
        assert_eq!(result.explanation[0].impact, 0.2);
    }

    #[test]
    fn test_non_finite_inputs_are_zero() {
        let lead = RawLead::from_value(json!({"pageViews": "NaN", "downloads": "inf"}));
        assert_eq!(score(&lead).score, 0.3);
    }

    proptest! {
        #[test]
        fn prop_score_in_unit_interval(
            page_views in proptest::num::f64::ANY,
            downloads in proptest::num::f64::ANY,
            webinar in any::<bool>(),
            size in prop::sample::select(vec!["Enterprise", "Mid-Market", "SMB", ""]),
            industry in prop::sample::select(vec!["Technology", "Retail", "Finance", ""]),
            title in ".{0,16}",
        ) {
            let lead = RawLead::from_value(json!({
                "pageViews": page_views.to_string(),
                "downloads": downloads.to_string(),
                "webinarAttended": webinar,
                "companySize": size,
                "industry": industry,
                "title": title,
            }));
            let result = score(&lead);
            prop_assert!(result.score >= 0.0 && result.score <= 1.0);
            prop_assert_eq!(result.explanation.len(), 5);
        }
    }
}

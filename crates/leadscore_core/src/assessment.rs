//! Sales-facing lead assessment
//!
//! Turns a scoring response into the intent score, tier, insights,
//! reasoning and next action shown to sales reps.

use crate::config::TierThresholds;
use crate::explain::ExplanationResult;
use crate::lead::RawLead;
use crate::signals::LeadSignals;
use serde::{Deserialize, Serialize};
use std::fmt;

const GENERIC_REASONING: &str = "Score is based on available engagement and company attributes.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentTier {
    Hot,
    Warm,
    Cold,
}

impl IntentTier {
    pub fn classify(score: f64, thresholds: &TierThresholds) -> Self {
        if score >= thresholds.hot {
            Self::Hot
        } else if score >= thresholds.warm {
            Self::Warm
        } else {
            Self::Cold
        }
    }
}

impl fmt::Display for IntentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hot => write!(f, "Hot"),
            Self::Warm => write!(f, "Warm"),
            Self::Cold => write!(f, "Cold"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadAssessment {
    /// Score scaled to 0..=100
    pub intent_score: u8,
    pub tier: IntentTier,
    pub insights: Vec<String>,
    pub reasoning: String,
    pub recommended_action: String,
}

impl LeadAssessment {
    pub fn build(lead: &RawLead, result: &ExplanationResult, thresholds: &TierThresholds) -> Self {
        let signals = LeadSignals::from_lead(lead);
        let tier = IntentTier::classify(result.score, thresholds);

        Self {
            intent_score: (result.score.clamp(0.0, 1.0) * 100.0).round() as u8,
            tier,
            insights: insights(&signals, result),
            reasoning: reasoning(&signals, result),
            recommended_action: recommended_action(&signals, tier),
        }
    }
}

fn insights(signals: &LeadSignals, result: &ExplanationResult) -> Vec<String> {
    let mut out = Vec::new();
    if signals.page_views > 0.0 {
        out.push(format!("Visited the website {} times.", signals.page_views));
    }
    if signals.downloads > 0.0 {
        out.push(format!("Downloaded {} resources.", signals.downloads));
    }
    if signals.webinar_attended {
        out.push("Attended a recent webinar.".to_string());
    }
    for entry in &result.explanation {
        if entry.impact > 0.0 {
            out.push(format!("Strong positive: {}.", entry.feature));
        } else if entry.impact < 0.0 {
            out.push(format!("Negative: {}.", entry.feature));
        }
    }
    out
}

fn reasoning(signals: &LeadSignals, result: &ExplanationResult) -> String {
    let templated: Vec<String> = result
        .positive_drivers()
        .filter_map(|entry| match entry.feature.as_str() {
            "Page Views" if signals.page_views > 0.0 => Some(format!(
                "High website engagement ({} page views)",
                signals.page_views
            )),
            "Downloads" if signals.downloads > 0.0 => Some(format!(
                "Interest in resources ({} downloads)",
                signals.downloads
            )),
            "Webinar Attendance" | "Webinar Attended" if signals.webinar_attended => {
                Some("Participation in a recent webinar".to_string())
            }
            "Company Size" => signals
                .company_size
                .as_ref()
                .map(|size| format!("Company size: {size}")),
            "Industry" => signals
                .industry
                .as_ref()
                .map(|industry| format!("Industry: {industry}")),
            _ => None,
        })
        .collect();

    if !templated.is_empty() {
        return format!("This score reflects {}.", templated.join(", "));
    }

    let mut reasons = Vec::new();
    if signals.page_views > 0.0 {
        reasons.push(format!(
            "high website engagement ({} page views)",
            signals.page_views
        ));
    }
    if signals.downloads > 0.0 {
        reasons.push(format!("interest in resources ({} downloads)", signals.downloads));
    }
    if signals.webinar_attended {
        reasons.push("participation in a recent webinar".to_string());
    }
    if let Some(size) = &signals.company_size {
        reasons.push(format!("company size: {size}"));
    }
    if let Some(industry) = &signals.industry {
        reasons.push(format!("industry: {industry}"));
    }

    if reasons.is_empty() {
        GENERIC_REASONING.to_string()
    } else {
        format!("Score is based on {}.", reasons.join(", "))
    }
}

fn recommended_action(signals: &LeadSignals, tier: IntentTier) -> String {
    let mut action = String::new();
    match tier {
        IntentTier::Hot => {
            action.push_str(
                "Assign to a senior SDR for immediate follow-up. Consider a personalized demo or proposal.",
            );
            if signals.webinar_attended {
                action.push_str(" Leverage their recent webinar attendance.");
            }
            if signals.downloads > 2.0 {
                action.push_str(" Highlight downloaded resources in outreach.");
            }
        }
        IntentTier::Warm => {
            action.push_str("Nurture with targeted content and schedule a discovery call.");
            if signals.page_views > 5.0 {
                action.push_str(" Reference their high website engagement.");
            }
        }
        IntentTier::Cold => {
            action.push_str(
                "Add to a long-term nurture campaign and monitor for future engagement.",
            );
            if signals.page_views == 0.0 && signals.downloads == 0.0 {
                action.push_str(" Encourage initial engagement.");
            }
        }
    }
    action
}

//! Business signals read from a raw lead
//!
//! Shared by the heuristic explainer, the fallback scorer and the lead
//! assessment so every rule-based path reads a lead the same way.

use crate::lead::{keys, RawLead};

pub const ENTERPRISE: &str = "Enterprise";
pub const MID_MARKET: &str = "Mid-Market";
pub const HIGH_VALUE_INDUSTRIES: &[&str] = &["Technology", "Finance", "Healthcare"];
pub const SENIOR_TITLE_KEYWORDS: &[&str] = &["CEO", "CTO", "VP", "Director", "Manager"];

/// Size tier of the lead's company
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    Enterprise,
    MidMarket,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadSignals {
    pub page_views: f64,
    pub downloads: f64,
    pub webinar_attended: bool,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub title: Option<String>,
}

impl LeadSignals {
    pub fn from_lead(lead: &RawLead) -> Self {
        Self {
            page_views: lead.number(keys::PAGE_VIEWS),
            downloads: lead.number(keys::DOWNLOADS),
            webinar_attended: lead.flag(keys::WEBINAR_ATTENDED),
            company_size: lead.text(keys::COMPANY_SIZE),
            industry: lead.text(keys::INDUSTRY),
            title: lead.text(keys::TITLE),
        }
    }

    pub fn size_tier(&self) -> SizeTier {
        match self.company_size.as_deref() {
            Some(ENTERPRISE) => SizeTier::Enterprise,
            Some(MID_MARKET) => SizeTier::MidMarket,
            _ => SizeTier::Other,
        }
    }

    pub fn high_value_industry(&self) -> bool {
        self.industry
            .as_deref()
            .is_some_and(|i| HIGH_VALUE_INDUSTRIES.contains(&i))
    }

    /// Case-sensitive keyword match against the raw title
    pub fn senior_title(&self) -> bool {
        self.title
            .as_deref()
            .is_some_and(|t| SENIOR_TITLE_KEYWORDS.iter().any(|k| t.contains(k)))
    }
}

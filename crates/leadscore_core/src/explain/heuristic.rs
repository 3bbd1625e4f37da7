//! Fixed-table explanation for the portable runtime
//!
//! Five business signals, always reported in the same order, each mapped to
//! a hand-specified impact. No model statistics are consulted.

use super::FeatureImpact;
use crate::signals::{LeadSignals, SizeTier};

pub const PAGE_VIEWS: &str = "Page Views";
pub const DOWNLOADS: &str = "Downloads";
pub const WEBINAR_ATTENDED: &str = "Webinar Attended";
pub const COMPANY_SIZE: &str = "Company Size";
pub const INDUSTRY: &str = "Industry";

pub fn page_views_impact(page_views: f64) -> f64 {
    if page_views > 10.0 {
        0.2
    } else if page_views > 5.0 {
        0.1
    } else {
        0.0
    }
}

pub fn downloads_impact(downloads: f64) -> f64 {
    if downloads > 2.0 {
        0.2
    } else if downloads > 0.0 {
        0.1
    } else {
        0.0
    }
}

pub fn company_size_impact(tier: SizeTier) -> f64 {
    match tier {
        SizeTier::Enterprise => 0.1,
        SizeTier::MidMarket => 0.05,
        SizeTier::Other => 0.0,
    }
}

/// Impact table for `signals`, in fixed signal order
pub fn explain(signals: &LeadSignals) -> Vec<FeatureImpact> {
    vec![
        FeatureImpact::new(PAGE_VIEWS, page_views_impact(signals.page_views)),
        FeatureImpact::new(DOWNLOADS, downloads_impact(signals.downloads)),
        FeatureImpact::new(
            WEBINAR_ATTENDED,
            if signals.webinar_attended { 0.15 } else { 0.0 },
        ),
        FeatureImpact::new(COMPANY_SIZE, company_size_impact(signals.size_tier())),
        FeatureImpact::new(
            INDUSTRY,
            if signals.high_value_industry() { 0.1 } else { 0.0 },
        ),
    ]
}

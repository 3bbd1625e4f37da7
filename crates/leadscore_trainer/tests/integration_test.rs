//! Integration tests for the lead scoring trainer
//!
//! Ensures identical models across runs and that the compiled artifact
//! scores exactly like the forest it was compiled from.

use anyhow::Result;
use leadscore_core::{encode, PortableRuntime, RawLead, ScoreSource, ScoringEngine};
use leadscore_trainer::{train_dataset, train_from_csv, Dataset, ForestConfig, TrainingOptions};
use proptest::prelude::*;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

const TITLES: [&str; 5] = ["CEO", "Analyst", "VP Sales", "Intern", "Marketing Manager"];
const INDUSTRIES: [&str; 4] = ["Technology", "Retail", "Finance", "Education"];
const SIZES: [&str; 3] = ["Enterprise", "Mid-Market", "SMB"];

/// Synthetic lead export where engagement drives conversion
fn synthetic_csv(rows: usize) -> String {
    let mut csv = String::from(
        "Name,Email,Title,Industry,Company Size,Page Views,Downloads,Webinar Attended,Website,Converted\n",
    );
    for i in 0..rows {
        let page_views = (i * 7) % 23;
        let downloads = (i * 3) % 5;
        let webinar = i % 3 == 0;
        let converted = page_views + 3 * downloads + if webinar { 5 } else { 0 } > 18;
        csv.push_str(&format!(
            "Lead {i},lead{i}@example.com,{},{},{},{page_views},{downloads},{},https://example.com,{}\n",
            TITLES[i % TITLES.len()],
            INDUSTRIES[(i / 2) % INDUSTRIES.len()],
            SIZES[(i / 3) % SIZES.len()],
            if webinar { "Yes" } else { "No" },
            u8::from(converted),
        ));
    }
    csv
}

fn create_synthetic_dataset() -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{}", synthetic_csv(120))?;
    file.flush()?;
    Ok(file)
}

fn small_options() -> TrainingOptions {
    TrainingOptions {
        forest: ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        },
        cv_folds: 3,
        ..TrainingOptions::default()
    }
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let file = create_synthetic_dataset()?;

    let first = train_from_csv(file.path(), &small_options())?;
    let second = train_from_csv(file.path(), &small_options())?;

    assert_eq!(first.model, second.model, "fitted models should be identical");
    assert_eq!(
        first.artifact.to_canonical_json()?,
        second.artifact.to_canonical_json()?,
        "artifacts should serialize identically"
    );
    assert_eq!(first.report.artifact_hash, second.report.artifact_hash);
    Ok(())
}

#[test]
fn test_parallel_and_sequential_training_agree() -> Result<()> {
    let dataset = Dataset::from_csv_str(&synthetic_csv(80))?;

    let parallel = train_dataset(dataset.clone(), &small_options())?;
    let mut options = small_options();
    options.forest.parallel = false;
    let sequential = train_dataset(dataset, &options)?;

    assert_eq!(parallel.report.artifact_hash, sequential.report.artifact_hash);
    Ok(())
}

#[test]
fn test_report_contents() -> Result<()> {
    let file = create_synthetic_dataset()?;
    let outcome = train_from_csv(file.path(), &small_options())?;
    let report = &outcome.report;

    assert_eq!(report.data_size, 120);
    assert_eq!(report.train_size + report.test_size, 120);
    assert!((23..=25).contains(&report.test_size));
    assert_eq!(report.num_features, outcome.model.vocabulary.len());
    assert!(report.train_accuracy > 0.8);
    assert!(report.test_accuracy.is_some());
    assert_eq!(report.cross_validation.as_ref().map(|cv| cv.folds), Some(3));
    assert!(!report.top_features.is_empty() && report.top_features.len() <= 10);
    assert_eq!(report.artifact_hash, outcome.artifact.hash_hex()?);

    let vocabulary = &outcome.model.vocabulary;
    assert!(!vocabulary.contains("Converted"));
    assert!(!vocabulary.contains("Email"));
    assert!(vocabulary.contains("Industry_Technology"));

    let json = serde_json::to_value(report)?;
    assert!(json.get("trained_at").is_some());
    Ok(())
}

#[test]
fn test_artifact_scores_like_forest() -> Result<()> {
    let file = create_synthetic_dataset()?;
    let outcome = train_from_csv(file.path(), &small_options())?;
    let runtime = PortableRuntime::from_json(&outcome.artifact.to_canonical_json()?)?;

    let dataset = Dataset::from_csv_str(&synthetic_csv(40))?;
    for i in 0..dataset.len() {
        let lead = dataset.lead(i);
        let values = encode(&lead, &outcome.model.vocabulary).into_values();
        let expected = outcome.model.forest.predict_proba(&values);
        let scored = runtime.try_score(&lead)?;
        assert!(
            (scored.score - expected).abs() < 1e-12,
            "row {i}: runtime {} vs forest {expected}",
            scored.score
        );
    }
    Ok(())
}

#[test]
fn test_unseen_category_scores_through_engine() -> Result<()> {
    let file = create_synthetic_dataset()?;
    let outcome = train_from_csv(file.path(), &small_options())?;
    let engine = ScoringEngine::from_artifact_json(&outcome.artifact.to_canonical_json()?);

    let lead = RawLead::from_value(json!({
        "title": "Chief Wizard",
        "industry": "Aerospace",
        "pageViews": 20,
        "downloads": 4,
        "webinarAttended": true
    }));
    let (result, source) = engine.score_with_source(&lead);
    assert_eq!(source, ScoreSource::Model);
    assert!((0.0..=1.0).contains(&result.score));
    assert_eq!(result.explanation.len(), 5);
    Ok(())
}

#[test]
fn test_exact_explanation_matches_score() -> Result<()> {
    let file = create_synthetic_dataset()?;
    let outcome = train_from_csv(file.path(), &small_options())?;
    let explainer = outcome.model.explainer(3)?;

    let lead = RawLead::from_value(json!({"pageViews": 20, "downloads": 4, "webinarAttended": "yes"}));
    let result = explainer.explain(&lead);
    let runtime = PortableRuntime::new(outcome.artifact.clone())?;

    assert!((result.score - runtime.try_score(&lead)?.score).abs() < 1e-12);
    assert!(result.explanation.len() <= 3);
    for pair in result.explanation.windows(2) {
        assert!(pair[0].impact.abs() >= pair[1].impact.abs());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_attribution_sums_to_score_minus_baseline(
        page_views in 0u32..30,
        downloads in 0u32..6,
        webinar in any::<bool>(),
        industry in 0usize..INDUSTRIES.len(),
    ) {
        let dataset = Dataset::from_csv_str(&synthetic_csv(60)).unwrap();
        let mut options = small_options();
        options.cv_folds = 0;
        let outcome = train_dataset(dataset, &options).unwrap();
        let explainer = outcome.model.explainer(5).unwrap();

        let lead = RawLead::from_value(json!({
            "pageViews": page_views,
            "downloads": downloads,
            "webinarAttended": webinar,
            "industry": INDUSTRIES[industry],
        }));
        let values = encode(&lead, &outcome.model.vocabulary).into_values();
        let attribution = explainer.attribute(&values).unwrap();

        prop_assert!((attribution.total() - (attribution.score - attribution.baseline)).abs() < 1e-9);
        prop_assert_eq!(attribution.score, outcome.model.forest.predict_proba(&values));
    }
}

//! CSV dataset loading and preprocessing
//!
//! Reads a lead export with a header row, keeps every column as text so the
//! shared encoder sees training rows exactly as it later sees live leads,
//! and provides deterministic shuffling and stratified splitting.

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use leadscore_core::{encode, FeatureVocabulary, LeadSchema, RawLead};
use std::path::Path;

use crate::deterministic::LcgRng;

/// Column holding the 0/1 conversion label
pub const TARGET_COLUMN: &str = "Converted";

/// Training table with text cells and binary targets
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub targets: Vec<u8>,
}

impl Dataset {
    /// Load dataset from a CSV file.
    ///
    /// The header row must contain `TARGET_COLUMN`. Cells are trimmed;
    /// quoted cells may hold commas, doubled quotes and line breaks.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read CSV file {}", path.display()))?;
        Self::from_csv_str(&content)
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();
        if header.is_empty() {
            bail!("Dataset is empty");
        }
        let target_col = header
            .iter()
            .position(|h| h == TARGET_COLUMN)
            .with_context(|| format!("Missing target column `{TARGET_COLUMN}`"))?;

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for record in reader.records() {
            let record = record.context("Malformed CSV record")?;
            let line = record.position().map_or(0, |p| p.line());
            let target = parse_target(&record[target_col])
                .with_context(|| format!("Line {line}: invalid target"))?;
            targets.push(target);
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            bail!("Dataset has a header but no rows");
        }

        Ok(Self {
            header,
            rows,
            targets,
        })
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `[negative, positive]` row counts
    pub fn class_counts(&self) -> [usize; 2] {
        let positive = self.targets.iter().filter(|&&t| t == 1).count();
        [self.targets.len() - positive, positive]
    }

    /// Deterministically shuffle the rows using `seed`
    pub fn shuffle(&mut self, seed: u64) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        LcgRng::new(seed).shuffle(&mut order);
        *self = self.subset(&order);
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            header: self.header.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Stratified train/test split.
    ///
    /// Each class contributes `round(count * test_fraction)` rows to the
    /// test side, so both sides keep the label balance.
    pub fn split(&self, test_fraction: f64, seed: u64) -> (Self, Self) {
        let mut rng = LcgRng::new(seed);
        let mut train = Vec::new();
        let mut test = Vec::new();

        for class in [0u8, 1] {
            let mut members: Vec<usize> = (0..self.len())
                .filter(|&i| self.targets[i] == class)
                .collect();
            rng.shuffle(&mut members);
            let n_test = ((members.len() as f64) * test_fraction).round() as usize;
            test.extend_from_slice(&members[..n_test]);
            train.extend_from_slice(&members[n_test..]);
        }

        rng.shuffle(&mut train);
        rng.shuffle(&mut test);
        (self.subset(&train), self.subset(&test))
    }

    /// Row `index` as a raw lead keyed by header names
    pub fn lead(&self, index: usize) -> RawLead {
        RawLead::from_columns(
            self.header
                .iter()
                .map(String::as_str)
                .zip(self.rows[index].iter().map(String::as_str)),
        )
    }

    pub fn vocabulary(&self, schema: &LeadSchema) -> FeatureVocabulary {
        FeatureVocabulary::derive(&self.header, &self.rows, schema)
    }

    /// Encode every row against `vocabulary`
    pub fn to_matrix(&self, vocabulary: &FeatureVocabulary) -> Vec<Vec<f64>> {
        (0..self.len())
            .map(|i| encode(&self.lead(i), vocabulary).into_values())
            .collect()
    }
}

fn parse_target(raw: &str) -> Result<u8> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Ok(1),
        "0" | "0.0" | "false" | "no" => Ok(0),
        other => bail!("expected 0 or 1, got `{other}`"),
    }
}

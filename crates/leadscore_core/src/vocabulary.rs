//! Feature vocabulary derivation
//!
//! The vocabulary is the ordered list of model input names. It is derived
//! once from the training table and embedded verbatim in the compiled
//! artifact, together with the field schema the encoder needs.
//!
//! Ordering follows one-hot expansion of a tabular frame: numeric and flag
//! columns first in column order, then every categorical column expanded to
//! one `"<Field>_<Category>"` indicator per distinct category, categories
//! sorted lexicographically within their column.

use crate::lead::keys;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// How a source field is turned into model inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Passed through as a float
    Numeric,
    /// Truthy values become 1, everything else 0
    Flag,
    /// Expanded into one indicator column per known category
    Categorical,
}

/// A source field retained in the vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name used at training time; prefix of indicator names
    pub name: String,
    pub kind: FieldKind,
    /// Additional keys accepted on incoming leads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// All keys this field may appear under, aliases first, column name last
    pub fn lookup_keys(&self) -> Vec<&str> {
        self.aliases
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
            .collect()
    }

    /// Name of the indicator column for `category`
    pub fn indicator(&self, category: &str) -> String {
        format!("{}_{}", self.name, category)
    }

    /// Whether encoding this field writes the vocabulary entry `name`
    pub fn produces(&self, name: &str) -> bool {
        match self.kind {
            FieldKind::Numeric | FieldKind::Flag => self.name == name,
            FieldKind::Categorical => name
                .strip_prefix(self.name.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .is_some_and(|category| !category.is_empty()),
        }
    }

    fn matches(&self, column: &str) -> bool {
        self.name == column || self.aliases.iter().any(|a| a == column)
    }
}

/// Declared field kinds and dropped columns for a training table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSchema {
    pub fields: Vec<FieldSpec>,
    /// Target and identity columns never fed to the model
    pub excluded: Vec<String>,
}

impl LeadSchema {
    /// Schema of the standard lead export
    pub fn standard() -> Self {
        let declared = [
            (keys::TITLE, FieldKind::Categorical),
            (keys::INDUSTRY, FieldKind::Categorical),
            (keys::COMPANY_SIZE, FieldKind::Categorical),
            (keys::PAGE_VIEWS, FieldKind::Numeric),
            (keys::DOWNLOADS, FieldKind::Numeric),
            (keys::WEBINAR_ATTENDED, FieldKind::Flag),
        ];
        Self {
            fields: declared
                .into_iter()
                .filter_map(|(k, kind)| {
                    k.split_last()
                        .map(|(column, aliases)| FieldSpec::new(column, kind, aliases))
                })
                .collect(),
            excluded: ["Converted", "Name", "Email", "Website"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn is_excluded(&self, column: &str) -> bool {
        self.excluded.iter().any(|c| c == column)
    }

    fn spec_for(&self, column: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.matches(column))
    }
}

impl Default for LeadSchema {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Serialize, Deserialize)]
struct VocabularyRepr {
    names: Vec<String>,
    fields: Vec<FieldSpec>,
}

/// Ordered, unique model input names plus the fields that produce them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "VocabularyRepr", into = "VocabularyRepr")]
pub struct FeatureVocabulary {
    names: Vec<String>,
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl From<VocabularyRepr> for FeatureVocabulary {
    fn from(repr: VocabularyRepr) -> Self {
        Self::new(repr.names, repr.fields)
    }
}

impl From<FeatureVocabulary> for VocabularyRepr {
    fn from(vocabulary: FeatureVocabulary) -> Self {
        Self {
            names: vocabulary.names,
            fields: vocabulary.fields,
        }
    }
}

impl PartialEq for FeatureVocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names && self.fields == other.fields
    }
}

impl FeatureVocabulary {
    /// Build from explicit names. Later duplicates are dropped.
    pub fn new(names: Vec<String>, fields: Vec<FieldSpec>) -> Self {
        let mut unique = Vec::with_capacity(names.len());
        let mut index = HashMap::with_capacity(names.len());
        for name in names {
            if index.contains_key(&name) {
                debug!(feature = %name, "dropping duplicate vocabulary entry");
                continue;
            }
            index.insert(name.clone(), unique.len());
            unique.push(name);
        }
        Self {
            names: unique,
            fields,
            index,
        }
    }

    /// Derive the vocabulary from a training table.
    ///
    /// Columns without a schema entry are numeric when every non-empty value
    /// parses as a float, categorical otherwise.
    pub fn derive(header: &[String], rows: &[Vec<String>], schema: &LeadSchema) -> Self {
        let mut fields = Vec::new();
        let mut numeric = Vec::new();
        let mut indicators = Vec::new();

        for (col, column) in header.iter().enumerate() {
            if schema.is_excluded(column) {
                continue;
            }

            let values = rows.iter().filter_map(|row| row.get(col)).map(|v| v.trim());
            let spec = match schema.spec_for(column) {
                Some(declared) => FieldSpec {
                    name: column.clone(),
                    kind: declared.kind,
                    aliases: declared
                        .lookup_keys()
                        .into_iter()
                        .filter(|k| *k != column.as_str())
                        .map(str::to_string)
                        .collect(),
                },
                None => {
                    let all_numeric = values
                        .clone()
                        .filter(|v| !v.is_empty())
                        .all(|v| v.parse::<f64>().is_ok());
                    let kind = if all_numeric {
                        FieldKind::Numeric
                    } else {
                        FieldKind::Categorical
                    };
                    debug!(column = %column, ?kind, "inferred field kind");
                    FieldSpec::new(column, kind, &[])
                }
            };

            match spec.kind {
                FieldKind::Numeric | FieldKind::Flag => numeric.push(spec.name.clone()),
                FieldKind::Categorical => {
                    let categories: BTreeSet<&str> = values.filter(|v| !v.is_empty()).collect();
                    indicators.extend(categories.into_iter().map(|c| spec.indicator(c)));
                }
            }
            fields.push(spec);
        }

        numeric.extend(indicators);
        Self::new(numeric, fields)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// First entry that no field produces
    pub fn unproduced_name(&self) -> Option<&str> {
        self.names
            .iter()
            .map(String::as_str)
            .find(|name| !self.fields.iter().any(|field| field.produces(name)))
    }
}

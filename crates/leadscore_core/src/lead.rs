//! Raw lead records with flexible key naming
//!
//! Callers send leads with whatever casing their source uses (`pageViews`,
//! `"Page Views"`, ...). A field is looked up under every accepted key in
//! order and the first non-empty value wins. Coercion never fails: anything
//! that cannot be read as the requested type degrades to zero/false/absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accepted keys for the standard lead fields in lookup order. The request
/// key comes first, the training column name last.
pub mod keys {
    pub const TITLE: &[&str] = &["title", "Title"];
    pub const INDUSTRY: &[&str] = &["industry", "Industry"];
    pub const COMPANY_SIZE: &[&str] = &["companySize", "Company Size"];
    pub const PAGE_VIEWS: &[&str] = &["pageViews", "Page Views"];
    pub const DOWNLOADS: &[&str] = &["downloads", "Downloads"];
    pub const WEBINAR_ATTENDED: &[&str] = &["webinarAttended", "Webinar Attended"];
}

/// An incoming lead as an untyped JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawLead(Map<String, Value>);

impl RawLead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value. Anything other than an object is an empty lead.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Value>(json).map(Self::from_value)
    }

    /// Build a lead from string columns, as read from a training table
    pub fn from_columns<'a, I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let map = columns
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        Self(map)
    }

    /// Builder-style insert, mostly for tests and fixtures
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// First non-empty value stored under any of `names`
    pub fn lookup<S: AsRef<str>>(&self, names: &[S]) -> Option<&Value> {
        names
            .iter()
            .filter_map(|name| self.0.get(name.as_ref()))
            .find(|value| !is_empty_value(value))
    }

    pub fn text<S: AsRef<str>>(&self, names: &[S]) -> Option<String> {
        self.lookup(names).and_then(coerce_text)
    }

    pub fn number<S: AsRef<str>>(&self, names: &[S]) -> f64 {
        self.lookup(names).map(coerce_number).unwrap_or(0.0)
    }

    pub fn flag<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.lookup(names).map(coerce_flag).unwrap_or(false)
    }
}

impl From<Map<String, Value>> for RawLead {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Trimmed text form of a scalar value
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Finite float form of a value, `0.0` when unreadable
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Truthiness for attendance-style flags
pub fn coerce_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(_) => coerce_number(value) != 0.0,
        Value::String(s) => {
            let s = s.trim();
            if ["true", "yes", "y"].iter().any(|t| s.eq_ignore_ascii_case(t)) {
                return true;
            }
            s.parse::<f64>().map(|v| v.is_finite() && v != 0.0).unwrap_or(false)
        }
        _ => false,
    }
}

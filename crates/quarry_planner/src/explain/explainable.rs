use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Rendered description of one plan node or fragment.
///
/// Properties are kept in a btree so entries render in a stable key order
/// regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainEntry {
    pub label: String,
    pub properties: BTreeMap<String, ExplainProperty>,
}

impl ExplainEntry {
    pub fn new(label: impl Into<String>) -> Self {
        ExplainEntry {
            label: label.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Attach a single-valued property.
    pub fn with_value(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.properties
            .insert(key.into(), ExplainProperty::Single(value.to_string()));
        self
    }

    /// Attach a list-valued property.
    pub fn with_values<S: fmt::Display>(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.properties
            .insert(key.into(), ExplainProperty::List(values));
        self
    }
}

impl fmt::Display for ExplainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)?;
        if self.properties.is_empty() {
            return Ok(());
        }
        let body = self
            .properties
            .iter()
            .map(|(key, prop)| format!("{key} = {prop}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, " ({body})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplainProperty {
    Single(String),
    List(Vec<String>),
}

impl fmt::Display for ExplainProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => f.write_str(value),
            Self::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

/// Controls how much detail nodes put into their entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplainConfig {
    pub verbose: bool,
}

impl ExplainConfig {
    pub const VERBOSE: Self = Self { verbose: true };
}

/// Trait for describing a single node in a plan or fragment tree.
pub trait Explainable {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry;
}

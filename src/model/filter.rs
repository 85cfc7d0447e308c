use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::EntityInstance;

/// Equality filter handed to the entity store: every `field = value` pair must hold.
/// An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreFilter {
    conditions: BTreeMap<String, Value>,
}

impl StoreFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.conditions.insert(field.into(), value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions
            .iter()
            .map(|(field, value)| (field.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Compares on the text form of both sides, so a path id "3" matches a numeric id 3.
    /// Null never matches, as in SQL.
    pub fn matches(&self, instance: &EntityInstance) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            match (instance.get(field).and_then(text_form), text_form(expected)) {
                (Some(actual), Some(expected)) => actual == expected,
                _ => false,
            }
        })
    }
}

/// Text rendering of a scalar used for key comparison; `None` for null
pub fn text_form(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

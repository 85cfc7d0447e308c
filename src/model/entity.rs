use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logic::errors::StoreError;

fn default_id_field() -> String {
    "id".to_string()
}

/// A one-to-many relationship: rows of `target` whose `foreign_key` holds this entity's id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasMany {
    /// Association name as exposed to `fields`, usually plural (e.g. "orders", "line_items")
    pub name: String,
    pub target: String,
    pub foreign_key: String,
}

/// A belongs-to relationship: this entity's `foreign_key` holds the id of a `target` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BelongsTo {
    pub target: String,
    pub foreign_key: String,
}

/// Schema-level description of an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity type name (e.g. "User", "Order")
    pub name: String,

    /// Backing table for SQL stores; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Scalar attributes owned by the entity, foreign key columns included
    pub attributes: Vec<String>,

    #[serde(default)]
    pub has_many: Vec<HasMany>,

    #[serde(default)]
    pub belongs_to: Vec<BelongsTo>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            id_field: default_id_field(),
            attributes: Vec::new(),
            has_many: Vec::new(),
            belongs_to: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes
            .extend(attributes.iter().map(|attribute| attribute.to_string()));
        self
    }

    pub fn with_has_many(mut self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.has_many.push(HasMany {
            name: name.to_string(),
            target: target.to_string(),
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn with_belongs_to(mut self, target: &str, foreign_key: &str) -> Self {
        self.belongs_to.push(BelongsTo {
            target: target.to_string(),
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// True when `field` is the id or one of the declared scalar attributes
    pub fn owns_attribute(&self, field: &str) -> bool {
        field == self.id_field || self.attributes.iter().any(|attribute| attribute == field)
    }
}

/// A single stored record of some entity type
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    pub entity: String,
    pub values: Map<String, Value>,
}

impl EntityInstance {
    pub fn new(entity: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            entity: entity.into(),
            values,
        }
    }

    /// Build an instance from a JSON object; anything else is a decode error
    pub fn from_value(entity: &str, value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(values) => Ok(Self::new(entity, values)),
            other => Err(StoreError::Decode {
                entity: entity.to_string(),
                message: format!("expected a JSON object, got {}", other),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// All stored values, unreduced
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_deserializes_with_defaults() {
        let descriptor: EntityDescriptor = serde_json::from_value(json!({
            "name": "User",
            "attributes": ["name", "email"],
            "has_many": [{"name": "orders", "target": "Order", "foreign_key": "userId"}]
        }))
        .unwrap();

        assert_eq!(descriptor.id_field, "id");
        assert_eq!(descriptor.table_name(), "User");
        assert!(descriptor.owns_attribute("id"));
        assert!(descriptor.owns_attribute("email"));
        assert!(!descriptor.owns_attribute("orders"));
        assert!(descriptor.belongs_to.is_empty());
    }

    #[test]
    fn test_instance_from_non_object_is_rejected() {
        let err = EntityInstance::from_value("User", json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));

        let instance = EntityInstance::from_value("User", json!({"id": 1, "name": "Ann"})).unwrap();
        assert_eq!(instance.get("name"), Some(&json!("Ann")));
    }
}

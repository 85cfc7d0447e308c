use parking_lot::RwLock;
use std::collections::HashMap;

use crate::logic::errors::StoreError;
use crate::model::{EntityDescriptor, EntityInstance, StoreFilter};
use crate::store::traits::EntityStore;

/// In-process entity store backed by hash maps.
///
/// Rows are returned in insertion order. Used for the demo dataset and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    descriptors: RwLock<HashMap<String, EntityDescriptor>>,
    rows: RwLock<HashMap<String, Vec<EntityInstance>>>,
    /// (entity, filter) pairs whose queries fail, for exercising error paths
    failures: RwLock<Vec<(String, StoreFilter)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an entity type
    pub fn register(&self, descriptor: EntityDescriptor) {
        self.rows.write().entry(descriptor.name.clone()).or_default();
        self.descriptors
            .write()
            .insert(descriptor.name.clone(), descriptor);
    }

    /// Append a row; the entity must be registered and the value must be a JSON object
    pub fn insert(&self, entity: &str, values: serde_json::Value) -> Result<(), StoreError> {
        if !self.descriptors.read().contains_key(entity) {
            return Err(StoreError::UnknownEntity(entity.to_string()));
        }
        let instance = EntityInstance::from_value(entity, values)?;
        self.rows
            .write()
            .entry(entity.to_string())
            .or_default()
            .push(instance);
        Ok(())
    }

    /// Make every query on `entity` with exactly this filter fail
    pub fn fail_on(&self, entity: &str, filter: StoreFilter) {
        self.failures.write().push((entity.to_string(), filter));
    }

    pub fn len(&self, entity: &str) -> usize {
        self.rows.read().get(entity).map(Vec::len).unwrap_or(0)
    }

    fn check_failure(&self, entity: &str, filter: &StoreFilter) -> Result<(), StoreError> {
        let failing = self
            .failures
            .read()
            .iter()
            .any(|(failing_entity, failing_filter)| {
                failing_entity == entity && failing_filter == filter
            });
        if failing {
            return Err(StoreError::Query {
                entity: entity.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn select(&self, entity: &str, filter: &StoreFilter) -> Result<Vec<EntityInstance>, StoreError> {
        self.check_failure(entity, filter)?;
        let rows = self.rows.read();
        let table = rows
            .get(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;
        Ok(table
            .iter()
            .filter(|instance| filter.matches(instance))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl EntityStore for MemoryStore {
    async fn find_many(
        &self,
        entity: &str,
        filter: &StoreFilter,
    ) -> Result<Vec<EntityInstance>, StoreError> {
        self.select(entity, filter)
    }

    async fn find_one(
        &self,
        entity: &str,
        filter: &StoreFilter,
    ) -> Result<Option<EntityInstance>, StoreError> {
        Ok(self.select(entity, filter)?.into_iter().next())
    }

    async fn describe(&self, entity: &str) -> Result<EntityDescriptor, StoreError> {
        self.descriptors
            .read()
            .get(entity)
            .cloned()
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.register(EntityDescriptor::new("Order").with_attributes(&["total", "userId"]));
        store
            .insert("Order", json!({"id": 10, "total": 5, "userId": 1}))
            .unwrap();
        store
            .insert("Order", json!({"id": 11, "total": 7, "userId": 2}))
            .unwrap();
        store
            .insert("Order", json!({"id": 12, "total": 9, "userId": 1}))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_find_many_filters_in_insertion_order() {
        let store = store();
        let orders = store
            .find_many("Order", &StoreFilter::new().where_eq("userId", json!(1)))
            .await
            .unwrap();

        let ids: Vec<_> = orders.iter().map(|o| o.get("id").cloned()).collect();
        assert_eq!(ids, vec![Some(json!(10)), Some(json!(12))]);
        assert_eq!(
            store.find_many("Order", &StoreFilter::new()).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_find_one_and_missing_rows() {
        let store = store();
        let found = store
            .find_one("Order", &StoreFilter::new().where_eq("id", json!("11")))
            .await
            .unwrap();
        assert_eq!(found.and_then(|o| o.get("total").cloned()), Some(json!(7)));

        let missing = store
            .find_one("Order", &StoreFilter::new().where_eq("id", json!(99)))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_unknown_entity_and_injected_failure() {
        let store = store();
        assert!(matches!(
            store.describe("Invoice").await,
            Err(StoreError::UnknownEntity(_))
        ));
        assert!(store.insert("Invoice", json!({"id": 1})).is_err());

        let filter = StoreFilter::new().where_eq("userId", json!(2));
        store.fail_on("Order", filter.clone());
        assert!(matches!(
            store.find_many("Order", &filter).await,
            Err(StoreError::Query { .. })
        ));
        assert!(store
            .find_many("Order", &StoreFilter::new().where_eq("userId", json!(1)))
            .await
            .is_ok());
    }
}

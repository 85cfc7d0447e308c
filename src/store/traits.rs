use crate::logic::errors::StoreError;
use crate::model::{EntityDescriptor, EntityInstance, StoreFilter};

/// Lookup capability the reducer needs from the persistence layer.
///
/// Implementations own any timeout or retry policy; the reducer calls each
/// method once and propagates the first failure.
#[async_trait::async_trait]
pub trait EntityStore: Send + Sync {
    /// All rows of `entity` matching `filter`, in a stable order
    async fn find_many(
        &self,
        entity: &str,
        filter: &StoreFilter,
    ) -> Result<Vec<EntityInstance>, StoreError>;

    /// The first row of `entity` matching `filter`
    async fn find_one(
        &self,
        entity: &str,
        filter: &StoreFilter,
    ) -> Result<Option<EntityInstance>, StoreError>;

    /// Schema description of `entity`
    async fn describe(&self, entity: &str) -> Result<EntityDescriptor, StoreError>;
}

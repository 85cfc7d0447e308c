use anyhow::{Context, Result};
use itertools::Itertools;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::HashMap;
use std::path::Path;

use crate::logic::errors::StoreError;
use crate::model::{text_form, EntityDescriptor, EntityInstance, StoreFilter};
use crate::store::traits::EntityStore;

/// Entity store over PostgreSQL tables.
///
/// Descriptors come from a JSON schema file; each row is read back as
/// `row_to_json` so arbitrary column sets decode without per-table structs.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    descriptors: HashMap<String, EntityDescriptor>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL and schema
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        descriptors: Vec<EntityDescriptor>,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        for descriptor in &descriptors {
            validate_descriptor(descriptor)?;
        }

        Ok(Self {
            pool,
            descriptors: descriptors
                .into_iter()
                .map(|descriptor| (descriptor.name.clone(), descriptor))
                .collect(),
        })
    }

    /// Read entity descriptors from a JSON file (an array of descriptors)
    pub fn load_schema(path: impl AsRef<Path>) -> Result<Vec<EntityDescriptor>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse schema file {}", path.display()))
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn descriptor(&self, entity: &str) -> Result<&EntityDescriptor, StoreError> {
        self.descriptors
            .get(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }

    async fn select(
        &self,
        entity: &str,
        filter: &StoreFilter,
        limit_one: bool,
    ) -> Result<Vec<EntityInstance>, StoreError> {
        let descriptor = self.descriptor(entity)?;
        let sql = select_sql(descriptor, filter, limit_one)?;

        let mut query = sqlx::query(&sql);
        for (_, value) in filter.iter() {
            query = query.bind(text_form(value));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query {
                entity: entity.to_string(),
                message: e.to_string(),
            })?;

        rows.into_iter()
            .map(|row| {
                let text: String = row.try_get("row_json").map_err(|e| StoreError::Decode {
                    entity: entity.to_string(),
                    message: e.to_string(),
                })?;
                let value = serde_json::from_str(&text).map_err(|e| StoreError::Decode {
                    entity: entity.to_string(),
                    message: e.to_string(),
                })?;
                EntityInstance::from_value(entity, value)
            })
            .collect()
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn validate_descriptor(descriptor: &EntityDescriptor) -> Result<()> {
    let names = std::iter::once(descriptor.table_name())
        .chain(std::iter::once(descriptor.id_field.as_str()))
        .chain(descriptor.attributes.iter().map(String::as_str));
    for name in names {
        if !is_sql_identifier(name) {
            anyhow::bail!(
                "Entity '{}' uses '{}', which is not a plain SQL identifier",
                descriptor.name,
                name
            );
        }
    }
    Ok(())
}

/// Build the SELECT for a filter. Values are bound as text and compared
/// against each column's text form, matching the in-memory store's semantics.
fn select_sql(
    descriptor: &EntityDescriptor,
    filter: &StoreFilter,
    limit_one: bool,
) -> Result<String, StoreError> {
    if let Some((column, _)) = filter.iter().find(|(column, _)| !is_sql_identifier(column)) {
        return Err(StoreError::Query {
            entity: descriptor.name.clone(),
            message: format!("invalid column name '{}'", column),
        });
    }

    let mut sql = format!(
        "SELECT row_to_json(t)::text AS row_json FROM \"{}\" t",
        descriptor.table_name()
    );
    if !filter.is_empty() {
        let conditions = filter
            .iter()
            .enumerate()
            .map(|(index, (column, _))| format!("t.\"{}\"::text = ${}", column, index + 1))
            .join(" AND ");
        sql.push_str(" WHERE ");
        sql.push_str(&conditions);
    }
    sql.push_str(&format!(" ORDER BY t.\"{}\"", descriptor.id_field));
    if limit_one {
        sql.push_str(" LIMIT 1");
    }
    Ok(sql)
}

#[async_trait::async_trait]
impl EntityStore for PostgresStore {
    async fn find_many(
        &self,
        entity: &str,
        filter: &StoreFilter,
    ) -> Result<Vec<EntityInstance>, StoreError> {
        self.select(entity, filter, false).await
    }

    async fn find_one(
        &self,
        entity: &str,
        filter: &StoreFilter,
    ) -> Result<Option<EntityInstance>, StoreError> {
        Ok(self.select(entity, filter, true).await?.into_iter().next())
    }

    async fn describe(&self, entity: &str) -> Result<EntityDescriptor, StoreError> {
        self.descriptor(entity).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn orders() -> EntityDescriptor {
        let mut descriptor = EntityDescriptor::new("Order").with_attributes(&["total", "userId"]);
        descriptor.table = Some("orders".to_string());
        descriptor
    }

    #[test]
    fn test_select_sql_with_filter() {
        let filter = StoreFilter::new()
            .where_eq("userId", json!(1))
            .where_eq("status", json!("open"));
        let sql = select_sql(&orders(), &filter, false).unwrap();
        assert_eq!(
            sql,
            "SELECT row_to_json(t)::text AS row_json FROM \"orders\" t \
             WHERE t.\"status\"::text = $1 AND t.\"userId\"::text = $2 ORDER BY t.\"id\""
        );
    }

    #[test]
    fn test_select_sql_without_filter_limited() {
        let sql = select_sql(&orders(), &StoreFilter::new(), true).unwrap();
        assert_eq!(
            sql,
            "SELECT row_to_json(t)::text AS row_json FROM \"orders\" t ORDER BY t.\"id\" LIMIT 1"
        );
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        let filter = StoreFilter::new().where_eq("id\" OR 1=1 --", json!(1));
        assert!(select_sql(&orders(), &filter, false).is_err());

        let mut descriptor = orders();
        descriptor.attributes.push("total; DROP TABLE orders".to_string());
        assert!(validate_descriptor(&descriptor).is_err());
        assert!(validate_descriptor(&orders()).is_ok());
    }
}

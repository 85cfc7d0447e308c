use futures::future::{BoxFuture, FutureExt};
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::logic::errors::ReduceError;
use crate::logic::naming::{ConventionalNames, NameResolver};
use crate::model::{
    BelongsTo, EntityDescriptor, EntityInstance, HasMany, Selection, SelectionTree, StoreFilter,
};
use crate::store::traits::EntityStore;

/// Tuning knobs for a reduction
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceOptions {
    /// Store an empty list instead of failing when a to-many fetch errors
    pub empty_on_fetch_failure: bool,
    /// Deepest selection nesting accepted
    pub max_depth: usize,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            empty_on_fetch_failure: false,
            max_depth: 16,
        }
    }
}

/// The data a reduction step walks: one instance or an ordered collection
#[derive(Debug, Clone, Copy)]
pub enum Reducible<'a> {
    One(&'a EntityInstance),
    Many(&'a [EntityInstance]),
}

/// Walks an entity graph alongside a selection tree, fetching related
/// entities on demand, and returns only the selected shape.
///
/// Fields and collection elements are processed one at a time in a fixed
/// order, so the first failure reported is always the same one.
pub struct Reducer<'a> {
    store: &'a dyn EntityStore,
    names: &'a dyn NameResolver,
    options: ReduceOptions,
}

impl<'a> Reducer<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self {
            store,
            names: &ConventionalNames,
            options: ReduceOptions::default(),
        }
    }

    pub fn with_names(mut self, names: &'a dyn NameResolver) -> Self {
        self.names = names;
        self
    }

    pub fn with_options(mut self, options: ReduceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ReduceOptions {
        &self.options
    }

    pub async fn reduce(
        &self,
        descriptor: &EntityDescriptor,
        data: Reducible<'_>,
        selection: &SelectionTree,
    ) -> Result<Value, ReduceError> {
        self.reduce_at(descriptor, data, selection, 1).await
    }

    fn reduce_at<'s>(
        &'s self,
        descriptor: &'s EntityDescriptor,
        data: Reducible<'s>,
        selection: &'s SelectionTree,
        depth: usize,
    ) -> BoxFuture<'s, Result<Value, ReduceError>> {
        async move {
            if depth > self.options.max_depth {
                return Err(ReduceError::InternalShapeConflict(format!(
                    "selection under {} nests deeper than {} levels",
                    descriptor.name, self.options.max_depth
                )));
            }

            match data {
                Reducible::One(instance) => {
                    self.reduce_instance(descriptor, instance, selection, depth)
                        .await
                }
                Reducible::Many(instances) => {
                    let mut shaped = Vec::with_capacity(instances.len());
                    for (index, instance) in instances.iter().enumerate() {
                        let value = self
                            .reduce_instance(descriptor, instance, selection, depth)
                            .await
                            .map_err(|source| ReduceError::AtIndex {
                                index,
                                source: Box::new(source),
                            })?;
                        shaped.push(value);
                    }
                    Ok(Value::Array(shaped))
                }
            }
        }
        .boxed()
    }

    async fn reduce_instance(
        &self,
        descriptor: &EntityDescriptor,
        instance: &EntityInstance,
        selection: &SelectionTree,
        depth: usize,
    ) -> Result<Value, ReduceError> {
        let mut output = Map::new();

        for (field, sub_selection) in selection.iter() {
            // scalars never recurse, even when given a nested selection
            if descriptor.owns_attribute(field) {
                let value = instance.get(field).cloned().unwrap_or(Value::Null);
                write_field(&mut output, descriptor, field.to_string(), value)?;
                continue;
            }

            if let Some(association) = descriptor
                .has_many
                .iter()
                .find(|association| self.names.matches_has_many(field, &association.name))
            {
                let value = self
                    .reduce_has_many(descriptor, instance, association, sub_selection, depth)
                    .await?;
                // one related collection becomes one singular output field
                write_field(&mut output, descriptor, self.names.singular(field), value)?;
                continue;
            }

            if let Some(reference) = descriptor
                .belongs_to
                .iter()
                .find(|reference| self.names.matches_belongs_to(field, &reference.foreign_key))
            {
                let value = self
                    .reduce_belongs_to(instance, reference, sub_selection, depth)
                    .await?;
                write_field(&mut output, descriptor, field.to_string(), value)?;
                continue;
            }

            return Err(ReduceError::UnknownField {
                entity: descriptor.name.clone(),
                field: field.to_string(),
            });
        }

        Ok(Value::Object(output))
    }

    async fn reduce_has_many(
        &self,
        descriptor: &EntityDescriptor,
        instance: &EntityInstance,
        association: &HasMany,
        selection: &Selection,
        depth: usize,
    ) -> Result<Value, ReduceError> {
        let id = instance
            .get(&descriptor.id_field)
            .cloned()
            .unwrap_or(Value::Null);
        let filter = StoreFilter::new().where_eq(association.foreign_key.clone(), id);

        debug!(
            "Fetching {} for {} via {}",
            association.target, descriptor.name, association.foreign_key
        );
        let related = match self.store.find_many(&association.target, &filter).await {
            Ok(related) => related,
            Err(err) if self.options.empty_on_fetch_failure => {
                warn!(
                    "Fetching {} for {} failed, substituting an empty list: {}",
                    association.target, descriptor.name, err
                );
                return Ok(Value::Array(Vec::new()));
            }
            Err(err) => {
                warn!(
                    "Fetching {} for {} failed: {}",
                    association.target, descriptor.name, err
                );
                return Err(ReduceError::FetchFailed(err));
            }
        };

        match selection {
            Selection::Leaf => Ok(Value::Array(
                related.iter().map(EntityInstance::to_value).collect(),
            )),
            Selection::Nested(tree) => {
                let target = self.store.describe(&association.target).await?;
                self.reduce_at(&target, Reducible::Many(&related), tree, depth + 1)
                    .await
            }
        }
    }

    async fn reduce_belongs_to(
        &self,
        instance: &EntityInstance,
        reference: &BelongsTo,
        selection: &Selection,
        depth: usize,
    ) -> Result<Value, ReduceError> {
        let foreign_id = match instance.get(&reference.foreign_key) {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Ok(Value::Null),
        };

        let target = self.store.describe(&reference.target).await?;
        let filter = StoreFilter::new().where_eq(target.id_field.clone(), foreign_id);

        debug!("Fetching {} via {}", reference.target, reference.foreign_key);
        let related = match self.store.find_one(&reference.target, &filter).await {
            Ok(Some(related)) => related,
            Ok(None) => return Ok(Value::Null),
            Err(err) => {
                warn!("Fetching {} failed: {}", reference.target, err);
                return Err(ReduceError::FetchFailed(err));
            }
        };

        if related.entity != target.name {
            return Err(ReduceError::InternalShapeConflict(format!(
                "store returned a {} row for {}",
                related.entity, target.name
            )));
        }

        match selection {
            Selection::Leaf => Ok(related.to_value()),
            Selection::Nested(tree) => {
                self.reduce_at(&target, Reducible::One(&related), tree, depth + 1)
                    .await
            }
        }
    }
}

/// Selection keys are unique, so a key already present was written by a
/// different field, e.g. `order` next to `orders(...)` singularized to `order`.
fn write_field(
    output: &mut Map<String, Value>,
    descriptor: &EntityDescriptor,
    key: String,
    value: Value,
) -> Result<(), ReduceError> {
    if output.contains_key(&key) {
        return Err(ReduceError::InternalShapeConflict(format!(
            "{} output field '{}' is written by two selected fields",
            descriptor.name, key
        )));
    }
    output.insert(key, value);
    Ok(())
}

/// Reduce `data` to the shape described by `selection`, using the default
/// naming conventions and options.
pub async fn reduce(
    descriptor: &EntityDescriptor,
    data: Reducible<'_>,
    selection: &SelectionTree,
    store: &dyn EntityStore,
) -> Result<Value, ReduceError> {
    Reducer::new(store).reduce(descriptor, data, selection).await
}

use serde_json::Value;

use crate::logic::errors::{PipelineError, ReduceError};
use crate::logic::parse::SelectionParser;
use crate::logic::reduce::{Reducer, Reducible};
use crate::model::{EntityDescriptor, EntityInstance, SelectionTree};

/// Primary payload produced by a read, before any field reduction
#[derive(Debug, Clone)]
pub enum Content {
    One(EntityInstance),
    Many(Vec<EntityInstance>),
}

impl Content {
    pub fn as_reducible(&self) -> Reducible<'_> {
        match self {
            Content::One(instance) => Reducible::One(instance),
            Content::Many(instances) => Reducible::Many(instances),
        }
    }

    /// Unreduced JSON rendering
    pub fn into_value(self) -> Value {
        match self {
            Content::One(instance) => Value::Object(instance.values),
            Content::Many(instances) => Value::Array(
                instances
                    .into_iter()
                    .map(|instance| Value::Object(instance.values))
                    .collect(),
            ),
        }
    }
}

/// Request stage: turn the raw `fields` parameter into a selection tree.
///
/// A missing or blank parameter means "no selection". Only GET requests may
/// carry one.
pub fn parse_fields(method: &str, raw: Option<&str>) -> Result<Option<SelectionTree>, PipelineError> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };

    if !method.eq_ignore_ascii_case("GET") {
        return Err(PipelineError::MethodNotAllowed(format!(
            "Fields parameter is not allowed for {} call.",
            method
        )));
    }

    Ok(Some(SelectionParser::parse(raw)?))
}

/// Response stage: reduce `content` to the requested shape.
///
/// Passes content through untouched when no selection was supplied. Upstream
/// failures never reach this stage; callers return them before reducing.
pub async fn reduce_fields_and_expand(
    reducer: &Reducer<'_>,
    descriptor: &EntityDescriptor,
    content: Option<Content>,
    selection: Option<&SelectionTree>,
) -> Result<Option<Value>, ReduceError> {
    let Some(content) = content else {
        return Ok(None);
    };
    let Some(selection) = selection else {
        return Ok(Some(content.into_value()));
    };

    let shaped = reducer
        .reduce(descriptor, content.as_reducible(), selection)
        .await?;
    Ok(Some(shaped))
}

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::Deserialize;

use crate::api::handlers::{pipeline_error, ErrorResponse};
use crate::logic::parse_fields;
use crate::model::SelectionTree;

/// Parsed `fields` query parameter, `None` when the request asked for full records.
///
/// Rejects with 405 when a non-GET request carries `fields`, and with 400
/// when the parameter does not parse or is given more than once.
#[derive(Debug, Clone, Default)]
pub struct Fields(pub Option<SelectionTree>);

#[derive(Debug, Deserialize)]
struct FieldsQuery {
    fields: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Fields
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<FieldsQuery>::try_from_uri(&parts.uri).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(&format!(
                    "Invalid query string: {}",
                    e.body_text()
                ))),
            )
        })?;

        let selection = parse_fields(parts.method.as_str(), query.fields.as_deref())
            .map_err(pipeline_error)?;
        Ok(Fields(selection))
    }
}

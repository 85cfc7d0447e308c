use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::fields_extractor::Fields;
use crate::logic::errors::StoreError;
use crate::logic::{
    reduce_fields_and_expand, Content, PipelineError, ReduceError, ReduceOptions, Reducer,
};
use crate::model::{EntityDescriptor, SelectionTree, StoreFilter};
use crate::store::traits::EntityStore;

/// Shared server state: the entity store plus reducer settings
#[derive(Debug)]
pub struct AppContext<S> {
    pub store: S,
    pub options: ReduceOptions,
}

pub type AppState<S> = Arc<AppContext<S>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Read payload; `content` is the (possibly reduced) entity or entity list
#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub content: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct FieldsPreviewResponse {
    pub fields: Option<SelectionTree>,
    pub depth: usize,
}

pub(crate) fn pipeline_error(err: PipelineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        PipelineError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        PipelineError::Parse(_) | PipelineError::Reduce(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

fn reduce_error(err: ReduceError) -> (StatusCode, Json<ErrorResponse>) {
    log::info!("Rejecting fields selection: {}", err);
    pipeline_error(PipelineError::Reduce(err))
}

fn store_error(err: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        StoreError::UnknownEntity(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(&err.to_string())),
        ),
        _ => {
            log::error!("Entity store failure: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(&err.to_string())),
            )
        }
    }
}

async fn respond<S: EntityStore>(
    context: &AppContext<S>,
    descriptor: &EntityDescriptor,
    content: Content,
    selection: Option<&SelectionTree>,
) -> ApiResult<ContentResponse> {
    let reducer = Reducer::new(&context.store).with_options(context.options.clone());
    let content = reduce_fields_and_expand(&reducer, descriptor, Some(content), selection)
        .await
        .map_err(reduce_error)?
        .unwrap_or(serde_json::Value::Null);
    Ok(Json(ContentResponse { content }))
}

/// Echo the parsed `fields` parameter, for checking a selection before using it
pub async fn preview_fields(Fields(selection): Fields) -> Json<FieldsPreviewResponse> {
    let depth = selection.as_ref().map(SelectionTree::depth).unwrap_or(0);
    Json(FieldsPreviewResponse {
        fields: selection,
        depth,
    })
}

pub async fn describe_entity<S: EntityStore>(
    State(state): State<AppState<S>>,
    Path(entity): Path<String>,
) -> ApiResult<EntityDescriptor> {
    let descriptor = state.store.describe(&entity).await.map_err(store_error)?;
    Ok(Json(descriptor))
}

pub async fn list_entities<S: EntityStore>(
    State(state): State<AppState<S>>,
    Path(entity): Path<String>,
    Fields(selection): Fields,
) -> ApiResult<ContentResponse> {
    let descriptor = state.store.describe(&entity).await.map_err(store_error)?;
    let instances = state
        .store
        .find_many(&entity, &StoreFilter::new())
        .await
        .map_err(store_error)?;

    respond(&state, &descriptor, Content::Many(instances), selection.as_ref()).await
}

pub async fn get_entity<S: EntityStore>(
    State(state): State<AppState<S>>,
    Path((entity, id)): Path<(String, String)>,
    Fields(selection): Fields,
) -> ApiResult<ContentResponse> {
    let descriptor = state.store.describe(&entity).await.map_err(store_error)?;
    // path ids arrive as text; stores compare on text form, so "1" finds id 1
    let filter = StoreFilter::new().where_eq(
        descriptor.id_field.clone(),
        serde_json::Value::String(id.clone()),
    );
    let instance = state
        .store
        .find_one(&entity, &filter)
        .await
        .map_err(store_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(&format!("{} '{}' not found", entity, id))),
            )
        })?;

    respond(&state, &descriptor, Content::One(instance), selection.as_ref()).await
}

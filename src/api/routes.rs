use axum::{routing::get, Router};

use crate::api::handlers::{self, AppState};
use crate::store::traits::EntityStore;

pub fn create_router<S: EntityStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Parse a `fields` value without reading anything
        .route("/fields/parse", get(handlers::preview_fields))
        // Entity schema
        .route("/schema/:entity", get(handlers::describe_entity::<S>))
        // Entity reads, reduced by `?fields=`
        .route("/entities/:entity", get(handlers::list_entities::<S>))
        .route("/entities/:entity/:id", get(handlers::get_entity::<S>))
}

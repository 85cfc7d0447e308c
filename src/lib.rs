pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

use std::sync::Arc;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export logic types
pub use logic::{
    parse_fields, reduce, reduce_fields_and_expand, ConventionalNames, NameResolver, ParseError,
    PipelineError, ReduceError, ReduceOptions, Reducer, Reducible, SelectionParser, StoreError,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{EntityStore, MemoryStore, PostgresStore};

/// Build the HTTP application over `store`
pub fn build_app<S: EntityStore + 'static>(store: S, options: ReduceOptions) -> axum::Router {
    let state = Arc::new(api::handlers::AppContext { store, options });
    api::routes::create_router().with_state(state)
}

/// Serve `app` on the configured address until the process is stopped
pub async fn run_server(app: axum::Router, config: &config::AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    log::info!("Partial response server running on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

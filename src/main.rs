use partial_response::config::{AppConfig, StoreKind};
use partial_response::seed;
use partial_response::store::{MemoryStore, PostgresStore};
use partial_response::{build_app, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{}, store={:?}",
        config.server.host,
        config.server.port,
        config.store
    );
    let options = config.reduce_options();

    match config.store {
        StoreKind::Memory => {
            let store = MemoryStore::new();
            seed::load_seed_data(&store)?;
            run_server(build_app(store, options), &config).await?;
        }
        StoreKind::Postgres => {
            let schema_path = config.database.schema_path.as_deref().ok_or_else(|| {
                anyhow::anyhow!("database.schema_path is required for the postgres store")
            })?;
            let descriptors = PostgresStore::load_schema(schema_path)?;

            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            let store = PostgresStore::new(
                &database_url,
                config.database.max_connections.unwrap_or(20),
                descriptors,
            )
            .await?;
            run_server(build_app(store, options), &config).await?;
        }
    }

    Ok(())
}

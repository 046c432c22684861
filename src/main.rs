use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use multidb_gateway_backend::api::routes::{create_router, AppState};
use multidb_gateway_backend::config::Config;
use multidb_gateway_backend::services::database::NativeAdapters;
use multidb_gateway_backend::services::schema::DdlGenerator;
use multidb_gateway_backend::services::{
    ImportService, QueryDispatcher, QueryService, ServerRegistry, Transliterator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let registry = ServerRegistry::load(&config.registry.path)
        .with_context(|| format!("Failed to load servers from {}", config.registry.path))
        .map_err(|e| {
            error!("{:#}", e);
            e
        })?;
    let registry = Arc::new(registry);

    let dispatcher = Arc::new(
        QueryDispatcher::new(
            config.dispatcher.max_concurrent,
            config.query_timeout(),
            Arc::new(NativeAdapters::new()),
        )
        .with_load_timeout(config.load_timeout()),
    );
    info!(
        "Dispatcher: {} concurrent operations, {:?} query timeout",
        dispatcher.max_concurrent(),
        dispatcher.query_timeout()
    );

    let queries = Arc::new(QueryService::new(registry.clone(), dispatcher.clone()));
    let imports = Arc::new(
        ImportService::new(
            registry.clone(),
            dispatcher.clone(),
            DdlGenerator::new(config.oracle_schema_password()),
        )
        .with_column_mapper(Arc::new(Transliterator::new()))
        .with_chunk_size(config.import.chunk_size)
        .with_ddl_policy(config.import.ddl_failure_policy),
    );

    let app = create_router(AppState { queries, imports });

    // Start server
    let addr: SocketAddr = config
        .server_address()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server_address()))?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

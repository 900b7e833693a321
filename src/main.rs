use std::sync::Arc;

use tracing::{info, warn};

use cinefeed::{
    api::{create_router, AppState},
    config::{Config, ProfileBackend},
    services::{
        CatalogClient, InMemoryProfileStore, ProfileStore, RecommendationAggregator,
        RedisProfileStore, TmdbCatalog,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,cinefeed=debug")),
        )
        .init();

    let config = Config::from_env()?;

    if !config.is_catalog_configured() {
        warn!("CATALOG_API_KEY is not set; catalog requests will fail until it is configured");
    }
    let catalog: Arc<dyn CatalogClient> = Arc::new(TmdbCatalog::from_config(&config)?);

    let profiles: Arc<dyn ProfileStore> = match config.profile_store {
        ProfileBackend::Memory => Arc::new(InMemoryProfileStore::new()),
        ProfileBackend::Redis => Arc::new(RedisProfileStore::connect(&config.redis_url).await?),
    };

    let aggregator = RecommendationAggregator::from_config(catalog.clone(), &config);
    info!(
        catalog = catalog.name(),
        profile_store = profiles.name(),
        failure_policy = ?aggregator.failure_policy(),
        "Services initialized"
    );

    let state = AppState::new(
        catalog,
        profiles,
        aggregator,
        config.catalog_image_base_url.clone(),
    );
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use jobboard_scraper::{
    config::{get_config, init_config},
    database::pool::connect_and_migrate,
    routes,
    services::{
        file_store::JsonFileStore, listing_service::ListingService, listing_store::ListingStore,
    },
    utils::logging::init_tracing,
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    init_config()?;
    let config = get_config();

    let api_key = config.require_api_key()?;

    let store: Arc<dyn ListingStore> = match (&config.database_url, &config.listings_file) {
        (Some(database_url), _) => {
            info!("Serving listings from Postgres");
            let pool = connect_and_migrate(database_url)
                .await
                .context("Failed to prepare database")?;
            Arc::new(ListingService::new(pool))
        }
        (None, Some(path)) => {
            info!(path = %path, "Serving listings from file");
            Arc::new(JsonFileStore::new(path))
        }
        (None, None) => anyhow::bail!("Set DATABASE_URL or LISTINGS_FILE to choose a listing store"),
    };

    let app = routes::router(AppState::new(store, api_key));

    let addr: SocketAddr = config
        .server_address
        .parse()
        .with_context(|| format!("Invalid SERVER_ADDRESS: {}", config.server_address))?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

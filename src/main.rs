use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use asx_sync::ingest::IngestionDriver;
use asx_sync::models::Config;
use asx_sync::provider::YahooFinanceClient;
use asx_sync::server::{router, AppState};
use asx_sync::store::SupabaseClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asx_sync=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Configuration error: {e}");
            eprintln!("Set SUPABASE_URL and SUPABASE_KEY in the environment or a .env file.");
            std::process::exit(1);
        }
    };

    // Clients are constructed here and injected; the request path never
    // initializes anything lazily
    let store = SupabaseClient::new(&config.supabase_url, &config.supabase_key)?;
    let provider = YahooFinanceClient::new()?;
    let driver = IngestionDriver::new(provider, store, &config);
    let state = Arc::new(AppState {
        driver,
        ticker_file: config.ticker_file.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

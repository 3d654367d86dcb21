use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ingest::IngestionDriver;
use crate::provider::FinancialDataProvider;
use crate::tickers;

/// Shared application state, built once at startup and injected into the
/// handlers; nothing is initialized lazily on the request path.
pub struct AppState<P> {
    pub driver: IngestionDriver<P>,
    pub ticker_file: String,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    status: &'static str,
    message: String,
}

pub fn router<P>(state: Arc<AppState<P>>) -> Router
where
    P: FinancialDataProvider + 'static,
{
    Router::new()
        .route("/", get(home))
        .route("/run-ingestion", get(run_ingestion::<P>))
        .with_state(state)
}

async fn home() -> &'static str {
    "Welcome to the ASX data sync service. Go to /run-ingestion to start a run."
}

/// Trigger a full ingestion run and block until it completes. The response
/// carries the accumulated run log and an overall status of success,
/// partial_success, or error.
async fn run_ingestion<P>(State(state): State<Arc<AppState<P>>>) -> impl IntoResponse
where
    P: FinancialDataProvider + 'static,
{
    let tickers = match tickers::load_tickers(&state.ticker_file) {
        Ok(tickers) if !tickers.is_empty() => tickers,
        Ok(_) => {
            let message = format!(
                "No tickers loaded from {}. Ensure the file exists and contains tickers.",
                state.ticker_file
            );
            warn!("{message}");
            return (
                StatusCode::BAD_REQUEST,
                Json(RunResponse {
                    status: "error",
                    message,
                }),
            );
        }
        Err(err) => {
            warn!("Ticker file error: {err:#}");
            return (
                StatusCode::BAD_REQUEST,
                Json(RunResponse {
                    status: "error",
                    message: format!("{err:#}"),
                }),
            );
        }
    };

    info!("Starting ingestion run for {} tickers", tickers.len());
    let report = state.driver.run(&tickers).await;

    (
        StatusCode::OK,
        Json(RunResponse {
            status: report.status().as_str(),
            message: report.message(),
        }),
    )
}

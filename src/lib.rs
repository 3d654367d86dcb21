pub mod ingest;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod records;
pub mod retry;
pub mod server;
pub mod store;
pub mod tickers;

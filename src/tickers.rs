use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Exchange suffix appended to bare ASX tickers.
pub const ASX_SUFFIX: &str = ".AX";

/// Load tickers from a plain-text file, one per line. Blank lines are
/// ignored; each ticker is upper-cased and given the `.AX` suffix when not
/// already present.
pub fn load_tickers(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ticker file {}", path.display()))?;

    let tickers: Vec<String> = content.lines().filter_map(normalize_ticker).collect();
    info!("Loaded {} tickers from {}", tickers.len(), path.display());
    Ok(tickers)
}

fn normalize_ticker(line: &str) -> Option<String> {
    let ticker = line.trim();
    if ticker.is_empty() {
        return None;
    }
    let ticker = ticker.to_uppercase();
    Some(if ticker.ends_with(ASX_SUFFIX) {
        ticker
    } else {
        format!("{ticker}{ASX_SUFFIX}")
    })
}

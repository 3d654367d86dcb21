use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Outcome of one batch upload. `Skipped` means the input was empty and no
/// network call was made. Resubmitting an identical batch is safe: the
/// conflict key turns the second call into a same-value overwrite.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Skipped,
    /// Batch accepted; `rows` is the affected-row count when the server
    /// returned a representation.
    Success { rows: Option<usize> },
    Error { message: String },
}

impl UploadOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, UploadOutcome::Error { .. })
    }
}

/// Client for a Supabase/PostgREST-style tabular store exposing an
/// upsert-with-conflict-key primitive per named table. Built once at startup
/// and shared read-only across the run.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("asx-sync/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        // Merge on the conflict key and echo the stored rows back
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        Ok(headers)
    }

    /// Upsert a batch in a single call and return the stored rows as reported
    /// by the server. Rows whose conflict-key columns match an existing row
    /// are overwritten; the rest are inserted.
    pub async fn upsert_returning<T: Serialize>(
        &self,
        table: &str,
        records: &[T],
        conflict_cols: &[&str],
    ) -> Result<Vec<Value>> {
        let url = format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url,
            table,
            conflict_cols.join(",")
        );
        debug!("Upserting {} records into {}", records.len(), table);

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(records)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "upsert into {table} failed with status {status}: {body}"
            ));
        }

        // An empty body still counts as an accepted batch; the server just
        // chose not to return a representation.
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<Value> = serde_json::from_str(&body)?;
        Ok(rows)
    }

    /// Upsert with skip/success/error folding for the driver. Never returns
    /// `Err`: remote failures become `UploadOutcome::Error` so a bad batch
    /// degrades the ticker instead of aborting the run.
    pub async fn upload<T: Serialize>(
        &self,
        table: &str,
        records: &[T],
        conflict_cols: &[&str],
    ) -> UploadOutcome {
        if records.is_empty() {
            info!("No data to upload for {table}");
            return UploadOutcome::Skipped;
        }

        match self.upsert_returning(table, records, conflict_cols).await {
            Ok(rows) if rows.is_empty() => {
                info!("Upload to {table} accepted with no rows returned");
                UploadOutcome::Success { rows: None }
            }
            Ok(rows) => {
                info!("Uploaded {} records to {table}", rows.len());
                UploadOutcome::Success {
                    rows: Some(rows.len()),
                }
            }
            Err(err) => {
                warn!("Upload to {table} failed: {err}");
                UploadOutcome::Error {
                    message: err.to_string(),
                }
            }
        }
    }
}

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::models::{Company, Config, Security, StatementKind, SECURITY_TYPE_COMMON_STOCK};
use crate::provider::FinancialDataProvider;
use crate::records::build_records;
use crate::retry::{retry, RetryPolicy};
use crate::store::{SupabaseClient, UploadOutcome};

pub const COMPANIES_TABLE: &str = "core.companies";
pub const SECURITIES_TABLE: &str = "core.securities";

/// Conflict key shared by all three financial-statement tables.
pub const FINANCIAL_CONFLICT_COLS: &[&str] = &["security_id", "fiscal_year", "fiscal_quarter"];

/// Classified per-ticker failure. None of these abort the run; they decide
/// whether a ticker is skipped or degraded to partial.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("entity resolution failed for {ticker}: {reason}")]
    EntityResolution { ticker: String, reason: String },

    #[error("{statement} fetch failed for {ticker}: {reason}")]
    StatementFetch {
        ticker: String,
        statement: &'static str,
        reason: String,
    },

    #[error("upload to {table} failed: {reason}")]
    Upload { table: String, reason: String },
}

/// Overall classification of one run, for the trigger response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::PartialSuccess => "partial_success",
            RunStatus::Error => "error",
        }
    }
}

/// Accumulated result of one full ingestion run: the human-readable log that
/// becomes the HTTP response body, plus the per-ticker outcome sets.
#[derive(Debug, Default)]
pub struct RunReport {
    pub log: Vec<String>,
    pub successful: Vec<String>,
    pub partially_failed: Vec<String>,
    pub skipped: Vec<String>,
    pub attempted: usize,
}

impl RunReport {
    /// Append a line to the run log and mirror it to the tracing sink. The
    /// two outputs are independent: the log feeds the HTTP response.
    fn note(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.log.push(line);
    }

    pub fn status(&self) -> RunStatus {
        if self.skipped.is_empty() && self.partially_failed.is_empty() {
            RunStatus::Success
        } else if self.successful.is_empty() {
            RunStatus::Error
        } else {
            RunStatus::PartialSuccess
        }
    }

    pub fn message(&self) -> String {
        self.log.join("\n")
    }

    fn summarize(&mut self) {
        fn join(tickers: &[String]) -> String {
            if tickers.is_empty() {
                "None".to_string()
            } else {
                tickers.join(", ")
            }
        }

        self.note("--- Ingestion summary ---".to_string());
        self.note(format!("Total tickers attempted: {}", self.attempted));
        self.note(format!(
            "Successfully processed (all financials): {} - {}",
            self.successful.len(),
            join(&self.successful)
        ));
        self.note(format!(
            "Partially failed (core data OK, some financials failed): {} - {}",
            self.partially_failed.len(),
            join(&self.partially_failed)
        ));
        self.note(format!(
            "Skipped (no provider data): {} - {}",
            self.skipped.len(),
            join(&self.skipped)
        ));
    }
}

/// Sequential ingestion driver: one ticker at a time, one statement at a
/// time. Entity resolution runs under foundational retry (exhaustion skips
/// the ticker); each statement runs under supplementary retry (exhaustion
/// degrades the ticker to partial).
pub struct IngestionDriver<P> {
    provider: P,
    store: SupabaseClient,
    retry_policy: RetryPolicy,
    request_delay: Duration,
}

impl<P: FinancialDataProvider> IngestionDriver<P> {
    pub fn new(provider: P, store: SupabaseClient, config: &Config) -> Self {
        Self {
            provider,
            store,
            retry_policy: RetryPolicy::new(config.max_retries, config.retry_delay),
            request_delay: config.request_delay,
        }
    }

    pub async fn run(&self, tickers: &[String]) -> RunReport {
        let mut report = RunReport {
            attempted: tickers.len(),
            ..RunReport::default()
        };

        for ticker in tickers {
            report.note(format!("--- Processing {ticker} ---"));

            let security_id = match retry(
                self.retry_policy,
                &format!("{ticker} entity resolution"),
                || self.resolve_entity(ticker),
            )
            .await
            {
                Ok((company_id, security_id)) => {
                    report.note(format!(
                        "Ensured core data for {ticker} (company {company_id}, security {security_id})"
                    ));
                    security_id
                }
                Err(exhausted) => {
                    report.note(format!(
                        "Failed to ensure core data for {ticker} after {} attempts: {}. Skipping this ticker.",
                        exhausted.attempts, exhausted.last_error
                    ));
                    report.skipped.push(ticker.clone());
                    continue;
                }
            };

            let mut any_failed = false;
            for kind in StatementKind::ALL {
                match retry(
                    self.retry_policy,
                    &format!("{ticker} {}", kind.label()),
                    || self.sync_statement(ticker, &security_id, kind),
                )
                .await
                {
                    Ok(UploadOutcome::Skipped) => {
                        report.note(format!("No {} data to upload for {ticker}", kind.label()));
                    }
                    Ok(UploadOutcome::Success { rows: Some(rows) }) => {
                        report.note(format!(
                            "Uploaded {rows} {} records for {ticker}",
                            kind.label()
                        ));
                    }
                    Ok(UploadOutcome::Success { rows: None }) => {
                        report.note(format!(
                            "{} upload for {ticker} accepted with no rows returned",
                            kind.label()
                        ));
                    }
                    Ok(UploadOutcome::Error { message }) => {
                        any_failed = true;
                        let err = IngestError::Upload {
                            table: kind.table().to_string(),
                            reason: message,
                        };
                        report.note(err.to_string());
                    }
                    Err(exhausted) => {
                        any_failed = true;
                        report.note(format!(
                            "Failed to sync {} for {ticker} after {} attempts: {}",
                            kind.label(),
                            exhausted.attempts,
                            exhausted.last_error
                        ));
                    }
                }

                // Courtesy pause toward the upstream provider; applies
                // regardless of outcome and is not an error-handling delay
                tokio::time::sleep(self.request_delay).await;
            }

            if any_failed {
                report.partially_failed.push(ticker.clone());
            } else {
                report.successful.push(ticker.clone());
            }
        }

        report.summarize();
        report
    }

    /// Upsert the company row, then the security row that references it, and
    /// return both generated ids. The security is never written before its
    /// company exists, and no financial record is written before the
    /// security exists.
    async fn resolve_entity(&self, ticker: &str) -> Result<(String, String), IngestError> {
        let entity_err = |reason: String| IngestError::EntityResolution {
            ticker: ticker.to_string(),
            reason,
        };

        let profile = self
            .provider
            .company_profile(ticker)
            .await
            .map_err(|e| entity_err(e.to_string()))?;

        let company_name = profile.name.clone().ok_or_else(|| {
            entity_err("provider returned no company name; ticker may be invalid or delisted".to_string())
        })?;

        let company = Company {
            ticker: ticker.to_string(),
            company_name,
            exchange: profile.exchange.clone(),
            sector: profile.sector.clone(),
            industry: profile.industry.clone(),
            country: profile.country.clone(),
            website: profile.website.clone(),
            description: profile.description.clone(),
        };
        let rows = self
            .store
            .upsert_returning(COMPANIES_TABLE, std::slice::from_ref(&company), &["ticker"])
            .await
            .map_err(|e| entity_err(e.to_string()))?;
        let company_id = row_id(&rows)
            .ok_or_else(|| entity_err(format!("no company id returned for {ticker} after upsert")))?;

        let security = Security {
            company_id: company_id.clone(),
            symbol: ticker.to_string(),
            security_type: SECURITY_TYPE_COMMON_STOCK.to_string(),
            currency: profile.currency.clone(),
        };
        let rows = self
            .store
            .upsert_returning(SECURITIES_TABLE, std::slice::from_ref(&security), &["symbol"])
            .await
            .map_err(|e| entity_err(e.to_string()))?;
        let security_id = row_id(&rows)
            .ok_or_else(|| entity_err(format!("no security id returned for {ticker} after upsert")))?;

        Ok((company_id, security_id))
    }

    /// Fetch one statement, build its records, and upload them. Upload
    /// failures come back as an `UploadOutcome::Error` value rather than an
    /// `Err`, so the retry wrapper only re-runs provider fetch failures.
    async fn sync_statement(
        &self,
        ticker: &str,
        security_id: &str,
        kind: StatementKind,
    ) -> Result<UploadOutcome, IngestError> {
        let table = self
            .provider
            .annual_statement(ticker, kind)
            .await
            .map_err(|e| IngestError::StatementFetch {
                ticker: ticker.to_string(),
                statement: kind.label(),
                reason: e.to_string(),
            })?;

        let records = build_records(&table, security_id, None);
        Ok(self
            .store
            .upload(kind.table(), &records, FINANCIAL_CONFLICT_COLS)
            .await)
    }
}

/// Pull the `id` column out of the first returned row. Supabase ids may be
/// UUID strings or integers depending on the schema.
fn row_id(rows: &[Value]) -> Option<String> {
    match rows.first()?.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_id_extraction() {
        assert_eq!(
            row_id(&[json!({ "id": "a2f5" })]),
            Some("a2f5".to_string())
        );
        assert_eq!(row_id(&[json!({ "id": 42 })]), Some("42".to_string()));
        assert_eq!(row_id(&[json!({ "other": 1 })]), None);
        assert_eq!(row_id(&[]), None);
    }

    #[test]
    fn test_run_status_classification() {
        let mut report = RunReport::default();
        report.successful.push("BHP.AX".to_string());
        assert_eq!(report.status(), RunStatus::Success);

        report.partially_failed.push("CBA.AX".to_string());
        assert_eq!(report.status(), RunStatus::PartialSuccess);

        report.successful.clear();
        assert_eq!(report.status(), RunStatus::Error);
    }

    #[test]
    fn test_run_status_strings() {
        assert_eq!(RunStatus::Success.as_str(), "success");
        assert_eq!(RunStatus::PartialSuccess.as_str(), "partial_success");
        assert_eq!(RunStatus::Error.as_str(), "error");
    }

    #[test]
    fn test_summary_lists_outcomes() {
        let mut report = RunReport {
            attempted: 3,
            ..RunReport::default()
        };
        report.successful.push("BHP.AX".to_string());
        report.partially_failed.push("CBA.AX".to_string());
        report.skipped.push("XYZ.AX".to_string());
        report.summarize();

        let message = report.message();
        assert!(message.contains("Total tickers attempted: 3"));
        assert!(message.contains("Successfully processed (all financials): 1 - BHP.AX"));
        assert!(message.contains("Partially failed"));
        assert!(message.contains("Skipped (no provider data): 1 - XYZ.AX"));
    }
}

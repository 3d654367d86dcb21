use anyhow::Result;

use crate::models::{CompanyProfile, StatementKind, StatementTable};

pub mod yahoo;
pub use yahoo::YahooFinanceClient;

/// A financial-data source exposing, per ticker, a company-metadata record
/// and annual financial statements as wide tables. The driver only depends on
/// this trait; concrete transports live behind it.
#[async_trait::async_trait]
pub trait FinancialDataProvider: Send + Sync {
    async fn company_profile(&self, ticker: &str) -> Result<CompanyProfile>;

    async fn annual_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<StatementTable>;
}

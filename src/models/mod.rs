use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::time::Duration;

/// Security type stored for every ingested listing.
pub const SECURITY_TYPE_COMMON_STOCK: &str = "COMMON_STOCK";

/// Company metadata as returned by the provider for one ticker. Every field
/// is optional; a missing company name is what marks a ticker as invalid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub currency: Option<String>,
}

/// Row shipped to the companies table. Identity key: `ticker`.
#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub ticker: String,
    pub company_name: String,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
}

/// Row shipped to the securities table. Identity key: `symbol`. Written only
/// after its owning company row exists.
#[derive(Debug, Clone, Serialize)]
pub struct Security {
    pub company_id: String,
    pub symbol: String,
    pub security_type: String,
    pub currency: Option<String>,
}

/// The three annual statements fetched per ticker, in fixed processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Income,
    BalanceSheet,
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::Income,
        StatementKind::BalanceSheet,
        StatementKind::CashFlow,
    ];

    /// Destination table for this statement's records.
    pub fn table(&self) -> &'static str {
        match self {
            StatementKind::Income => "financials.income_statements_annual",
            StatementKind::BalanceSheet => "financials.balance_sheets_annual",
            StatementKind::CashFlow => "financials.cash_flows_annual",
        }
    }

    /// Human-readable name for logs and run reports.
    pub fn label(&self) -> &'static str {
        match self {
            StatementKind::Income => "Income Statement",
            StatementKind::BalanceSheet => "Balance Sheet",
            StatementKind::CashFlow => "Cash Flow",
        }
    }
}

/// Wide financial-statement table as returned by the provider: columns are
/// reporting periods, rows are line items with arbitrary labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementTable {
    pub periods: Vec<NaiveDate>,
    pub line_items: Vec<LineItem>,
}

impl StatementTable {
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// One statement row: a label plus one cell per period. `None` cells mean the
/// provider reported no value for that period.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub label: String,
    pub cells: Vec<Option<CellValue>>,
}

/// Raw cell content before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Text(String),
}

/// Normalized field value as written to the datastore.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    pub fn into_json(self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(b),
            FieldValue::Date(d) => serde_json::Value::String(d.to_string()),
            FieldValue::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// One row per (security, fiscal year, fiscal quarter): a fixed header plus a
/// variable set of normalized-name fields, flattened into a single flat
/// mapping when serialized for upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialRecord {
    pub security_id: String,
    pub report_date: NaiveDate,
    pub fiscal_year: i32,
    /// `None` for annual statements.
    pub fiscal_quarter: Option<u8>,
    #[serde(flatten)]
    pub line_items: serde_json::Map<String, serde_json::Value>,
}

/// Configuration for the service.
#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_key: String,
    pub ticker_file: String,
    pub port: u16,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables. The datastore endpoint
    /// and credential are required; there are no baked-in fallbacks.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            supabase_url: std::env::var("SUPABASE_URL")
                .map_err(|_| anyhow::anyhow!("SUPABASE_URL environment variable required"))?,
            supabase_key: std::env::var("SUPABASE_KEY")
                .map_err(|_| anyhow::anyhow!("SUPABASE_KEY environment variable required"))?,
            ticker_file: std::env::var("TICKER_FILE")
                .unwrap_or_else(|_| "tickers_to_use.txt".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            max_retries: std::env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            retry_delay: Duration::from_secs(
                std::env::var("RETRY_DELAY_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            ),
            request_delay: Duration::from_secs(
                std::env::var("REQUEST_DELAY_SECONDS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_financial_record_serializes_flat() {
        let mut line_items = serde_json::Map::new();
        line_items.insert("total_revenue".to_string(), json!(1_000_000.0));
        line_items.insert("net_income".to_string(), serde_json::Value::Null);

        let record = FinancialRecord {
            security_id: "sec-1".to_string(),
            report_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            fiscal_year: 2024,
            fiscal_quarter: None,
            line_items,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["security_id"], json!("sec-1"));
        assert_eq!(value["report_date"], json!("2024-06-30"));
        assert_eq!(value["fiscal_year"], json!(2024));
        assert_eq!(value["fiscal_quarter"], serde_json::Value::Null);
        // Variable fields sit next to the header, not nested under a key
        assert_eq!(value["total_revenue"], json!(1_000_000.0));
        assert_eq!(value["net_income"], serde_json::Value::Null);
    }

    #[test]
    fn test_field_value_json_conversion() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(FieldValue::Null.into_json(), serde_json::Value::Null);
        assert_eq!(FieldValue::Number(2.5).into_json(), json!(2.5));
        assert_eq!(FieldValue::Bool(true).into_json(), json!(true));
        assert_eq!(FieldValue::Date(date).into_json(), json!("2023-12-31"));
        assert_eq!(
            FieldValue::Text("AUD".to_string()).into_json(),
            json!("AUD")
        );
        // Non-finite numbers cannot be represented in JSON
        assert_eq!(
            FieldValue::Number(f64::NAN).into_json(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn test_statement_kind_tables() {
        assert_eq!(
            StatementKind::Income.table(),
            "financials.income_statements_annual"
        );
        assert_eq!(
            StatementKind::BalanceSheet.table(),
            "financials.balance_sheets_annual"
        );
        assert_eq!(
            StatementKind::CashFlow.table(),
            "financials.cash_flows_annual"
        );
    }

    #[test]
    fn test_config_from_env() {
        std::env::set_var("SUPABASE_URL", "https://example.supabase.co");
        std::env::set_var("SUPABASE_KEY", "test_key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.supabase_url, "https://example.supabase.co");
        assert_eq!(config.supabase_key, "test_key");
        assert_eq!(config.max_retries, 3); // default value
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.request_delay, Duration::from_secs(2));
    }
}

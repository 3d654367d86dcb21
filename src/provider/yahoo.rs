use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::models::{CellValue, CompanyProfile, LineItem, StatementKind, StatementTable};
use super::FinancialDataProvider;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// How far back annual statements are requested, in years.
const STATEMENT_LOOKBACK_YEARS: i64 = 6;

/// Fundamentals-timeseries keys requested per statement. Yahoo answers with
/// whatever subset it has for the entity; absent keys simply produce no rows.
const INCOME_TYPES: &[&str] = &[
    "annualTotalRevenue",
    "annualCostOfRevenue",
    "annualGrossProfit",
    "annualOperatingExpense",
    "annualOperatingIncome",
    "annualPretaxIncome",
    "annualTaxProvision",
    "annualNetIncome",
    "annualBasicEPS",
    "annualDilutedEPS",
    "annualEBITDA",
];

const BALANCE_SHEET_TYPES: &[&str] = &[
    "annualTotalAssets",
    "annualCurrentAssets",
    "annualCashAndCashEquivalents",
    "annualInventory",
    "annualCurrentLiabilities",
    "annualTotalLiabilitiesNetMinorityInterest",
    "annualLongTermDebt",
    "annualStockholdersEquity",
    "annualRetainedEarnings",
    "annualWorkingCapital",
];

const CASH_FLOW_TYPES: &[&str] = &[
    "annualOperatingCashFlow",
    "annualInvestingCashFlow",
    "annualFinancingCashFlow",
    "annualCapitalExpenditure",
    "annualFreeCashFlow",
    "annualEndCashPosition",
    "annualRepurchaseOfCapitalStock",
    "annualCashDividendsPaid",
];

fn statement_types(kind: StatementKind) -> &'static [&'static str] {
    match kind {
        StatementKind::Income => INCOME_TYPES,
        StatementKind::BalanceSheet => BALANCE_SHEET_TYPES,
        StatementKind::CashFlow => CASH_FLOW_TYPES,
    }
}

/// Yahoo Finance client: company metadata via the quoteSummary endpoint,
/// annual statements via the fundamentals-timeseries endpoint.
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at a different host; used by tests to run against a
    /// local mock server.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("asx-sync/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("Making request to: {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "provider request failed with status {status}: {error_text}"
            ));
        }

        let json: Value = response.json().await?;
        Ok(json)
    }
}

#[async_trait::async_trait]
impl FinancialDataProvider for YahooFinanceClient {
    async fn company_profile(&self, ticker: &str) -> Result<CompanyProfile> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=assetProfile,price",
            self.base_url, ticker
        );
        let data = self.get_json(&url).await?;

        let result = data
            .get("quoteSummary")
            .and_then(|q| q.get("result"))
            .and_then(|r| r.get(0))
            .ok_or_else(|| anyhow!("no quoteSummary data for {ticker}"))?;

        let price = result.get("price");
        let profile = result.get("assetProfile");
        let text = |node: Option<&Value>, key: &str| {
            node.and_then(|n| n.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Ok(CompanyProfile {
            name: text(price, "longName").or_else(|| text(price, "shortName")),
            exchange: text(price, "exchangeName"),
            sector: text(profile, "sector"),
            industry: text(profile, "industry"),
            country: text(profile, "country"),
            website: text(profile, "website"),
            description: text(profile, "longBusinessSummary"),
            currency: text(price, "currency"),
        })
    }

    async fn annual_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<StatementTable> {
        let period2 = Utc::now().timestamp();
        let period1 = period2 - STATEMENT_LOOKBACK_YEARS * 365 * 86_400;
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}?symbol={}&type={}&period1={}&period2={}",
            self.base_url,
            ticker,
            ticker,
            statement_types(kind).join(","),
            period1,
            period2,
        );
        let data = self.get_json(&url).await?;
        let table = parse_timeseries(&data);
        debug!(
            "Parsed {} periods x {} line items of {} data for {ticker}",
            table.periods.len(),
            table.line_items.len(),
            kind.label()
        );
        Ok(table)
    }
}

/// Build a wide table from a fundamentals-timeseries response. A response
/// with no result entries is treated as an empty table, not an error; the
/// upstream contract does not distinguish "nothing reported" from "nothing
/// exists".
fn parse_timeseries(data: &Value) -> StatementTable {
    let entries = match data
        .get("timeseries")
        .and_then(|t| t.get("result"))
        .and_then(Value::as_array)
    {
        Some(entries) => entries,
        None => return StatementTable::default(),
    };

    // First pass: the union of reporting periods across all line items
    let mut period_set = BTreeSet::new();
    for entry in entries {
        for (date, _) in entry_rows(entry) {
            period_set.insert(date);
        }
    }
    let periods: Vec<NaiveDate> = period_set.into_iter().collect();

    // Second pass: one row per line item, cells aligned to the period axis
    let mut line_items = Vec::new();
    for entry in entries {
        let type_name = match entry
            .get("meta")
            .and_then(|m| m.get("type"))
            .and_then(|t| t.get(0))
            .and_then(Value::as_str)
        {
            Some(name) => name,
            None => continue,
        };

        let by_period: HashMap<NaiveDate, CellValue> = entry_rows(entry).into_iter().collect();
        if by_period.is_empty() {
            continue;
        }

        line_items.push(LineItem {
            label: humanize_type(type_name),
            cells: periods.iter().map(|p| by_period.get(p).cloned()).collect(),
        });
    }

    StatementTable {
        periods,
        line_items,
    }
}

/// Extract the (asOfDate, value) rows of one timeseries entry. Yahoo pads
/// missing years with JSON nulls; those are dropped here.
fn entry_rows(entry: &Value) -> Vec<(NaiveDate, CellValue)> {
    let type_name = match entry
        .get("meta")
        .and_then(|m| m.get("type"))
        .and_then(|t| t.get(0))
        .and_then(Value::as_str)
    {
        Some(name) => name,
        None => return Vec::new(),
    };

    let rows = match entry.get(type_name).and_then(Value::as_array) {
        Some(rows) => rows,
        None => return Vec::new(),
    };

    rows.iter()
        .filter_map(|row| {
            let date = row
                .get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?;
            let raw = row.get("reportedValue").and_then(|v| v.get("raw"))?;
            let cell = if let Some(b) = raw.as_bool() {
                CellValue::Bool(b)
            } else if let Some(n) = raw.as_f64() {
                CellValue::Number(n)
            } else {
                CellValue::Text(raw.as_str()?.to_string())
            };
            Some((date, cell))
        })
        .collect()
}

/// Turn a timeseries key like `annualTotalRevenue` into the human label the
/// normalizer expects, e.g. `Total Revenue`. Acronym runs are kept intact
/// (`annualBasicEPS` -> `Basic EPS`).
fn humanize_type(raw: &str) -> String {
    let name = raw
        .strip_prefix("annual")
        .or_else(|| raw.strip_prefix("trailing"))
        .unwrap_or(raw);

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars
                .get(i + 1)
                .map_or(false, |n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

//! Shared helpers for the integration tests: a scripted in-memory provider
//! and wiremock fixtures for the datastore.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use asx_sync::models::{
    CellValue, CompanyProfile, Config, LineItem, StatementKind, StatementTable,
};
use asx_sync::provider::FinancialDataProvider;

/// Fast-running configuration pointed at a mock datastore.
pub fn test_config(store_url: &str) -> Config {
    Config {
        supabase_url: store_url.to_string(),
        supabase_key: "test-key".to_string(),
        ticker_file: "tickers_to_use.txt".to_string(),
        port: 0,
        max_retries: 3,
        retry_delay: Duration::ZERO,
        request_delay: Duration::ZERO,
    }
}

pub fn sample_statement_table() -> StatementTable {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
    StatementTable {
        periods: vec![date(2023, 6, 30), date(2024, 6, 30)],
        line_items: vec![
            LineItem {
                label: "Total Revenue".to_string(),
                cells: vec![
                    Some(CellValue::Number(100.0)),
                    Some(CellValue::Number(120.0)),
                ],
            },
            LineItem {
                label: "Net Income".to_string(),
                cells: vec![Some(CellValue::Number(10.0)), None],
            },
        ],
    }
}

struct ProviderState {
    /// Leading company_profile calls that fail before the first success.
    profile_failures: u32,
    profile_calls: AtomicU32,
    statement_calls: AtomicU32,
    seen_tickers: Mutex<Vec<String>>,
}

/// Scripted provider: answers with canned data after an optional run of
/// simulated outages. Clones share state so tests can keep a handle while
/// the driver owns another.
#[derive(Clone)]
pub struct ScriptedProvider {
    inner: Arc<ProviderState>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::failing_profiles(0)
    }

    pub fn failing_profiles(profile_failures: u32) -> Self {
        Self {
            inner: Arc::new(ProviderState {
                profile_failures,
                profile_calls: AtomicU32::new(0),
                statement_calls: AtomicU32::new(0),
                seen_tickers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn always_failing_profiles() -> Self {
        Self::failing_profiles(u32::MAX)
    }

    pub fn profile_calls(&self) -> u32 {
        self.inner.profile_calls.load(Ordering::SeqCst)
    }

    pub fn statement_calls(&self) -> u32 {
        self.inner.statement_calls.load(Ordering::SeqCst)
    }

    pub fn seen_tickers(&self) -> Vec<String> {
        self.inner.seen_tickers.lock().unwrap().clone()
    }
}

#[async_trait]
impl FinancialDataProvider for ScriptedProvider {
    async fn company_profile(&self, ticker: &str) -> Result<CompanyProfile> {
        let call = self.inner.profile_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .seen_tickers
            .lock()
            .unwrap()
            .push(ticker.to_string());

        if call <= self.inner.profile_failures {
            return Err(anyhow!("simulated provider outage"));
        }

        Ok(CompanyProfile {
            name: Some("BHP Group Limited".to_string()),
            exchange: Some("ASX".to_string()),
            sector: Some("Basic Materials".to_string()),
            industry: Some("Other Industrial Metals & Mining".to_string()),
            country: Some("Australia".to_string()),
            website: Some("https://www.bhp.com".to_string()),
            description: Some("Diversified resources company.".to_string()),
            currency: Some("AUD".to_string()),
        })
    }

    async fn annual_statement(
        &self,
        _ticker: &str,
        _kind: StatementKind,
    ) -> Result<StatementTable> {
        self.inner.statement_calls.fetch_add(1, Ordering::SeqCst);
        Ok(sample_statement_table())
    }
}

/// Mount companies/securities upsert responses that echo back generated ids.
pub async fn mount_entity_tables(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/core.companies"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "comp-1" }])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/core.securities"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "sec-1" }])))
        .mount(server)
        .await;
}

/// Mount a happy-path response for one statement table.
pub async fn mount_statement_table(server: &MockServer, table: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/rest/v1/{table}")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "security_id": "sec-1", "fiscal_year": 2023 },
            { "security_id": "sec-1", "fiscal_year": 2024 }
        ])))
        .mount(server)
        .await;
}

pub async fn mount_all_statement_tables(server: &MockServer) {
    for kind in StatementKind::ALL {
        mount_statement_table(server, kind.table()).await;
    }
}

//! MetricDataClient trait and implementations.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------ //
//  Wire types                                                         //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metric {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricStat {
    pub metric: Metric,
    pub period: u32,
    pub stat: String,
}

/// One entry of a batched request. Exactly one of `metric_stat` and
/// `expression` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDataQuery {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_stat: Option<MetricStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    pub return_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanBy {
    TimestampAscending,
    TimestampDescending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetMetricDataInput {
    pub region: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub metric_data_queries: Vec<MetricDataQuery>,
    pub scan_by: ScanBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusCode {
    #[default]
    Complete,
    PartialData,
    InternalError,
    Forbidden,
}

impl StatusCode {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Complete => "Complete",
            StatusCode::PartialData => "PartialData",
            StatusCode::InternalError => "InternalError",
            StatusCode::Forbidden => "Forbidden",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageData {
    pub code: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDataResult {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub timestamps: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub status_code: StatusCode,
    #[serde(default)]
    pub messages: Vec<MessageData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetMetricDataOutput {
    #[serde(default)]
    pub metric_data_results: Vec<MetricDataResult>,
    #[serde(default)]
    pub next_token: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageData>,
}

// ------------------------------------------------------------------ //
//  Trait                                                              //
// ------------------------------------------------------------------ //

/// One page of a batched metric data exchange with the remote backend.
///
/// Credentials, retries and backoff live behind this seam.
#[async_trait]
pub trait MetricDataClient: Send + Sync {
    async fn get_metric_data(&self, input: &GetMetricDataInput) -> Result<GetMetricDataOutput>;
}

// ------------------------------------------------------------------ //
//  FakeMetricDataClient (for tests)                                   //
// ------------------------------------------------------------------ //

/// In-memory client that records every input and replays scripted pages.
///
/// Once the script runs out every call answers with an empty page.
#[derive(Debug, Default, Clone)]
pub struct FakeMetricDataClient {
    pub calls: Arc<Mutex<Vec<GetMetricDataInput>>>,
    pages: Arc<Mutex<VecDeque<Result<GetMetricDataOutput, String>>>>,
}

impl FakeMetricDataClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue pages to be returned in order.
    pub fn with_pages(pages: impl IntoIterator<Item = GetMetricDataOutput>) -> Self {
        let fake = Self::default();
        fake.pages.lock().unwrap().extend(pages.into_iter().map(Ok));
        fake
    }

    /// Queue a failing call.
    pub fn push_failure(&self, message: &str) {
        self.pages.lock().unwrap().push_back(Err(message.to_string()));
    }

    /// Non-destructive snapshot of the inputs received so far.
    pub fn snapshot(&self) -> Vec<GetMetricDataInput> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricDataClient for FakeMetricDataClient {
    async fn get_metric_data(&self, input: &GetMetricDataInput) -> Result<GetMetricDataOutput> {
        self.calls.lock().unwrap().push(input.clone());
        match self.pages.lock().unwrap().pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(GetMetricDataOutput::default()),
        }
    }
}

// ------------------------------------------------------------------ //
//  HttpMetricDataClient (production)                                  //
// ------------------------------------------------------------------ //

/// Production client speaking JSON `GetMetricData` over HTTP.
pub struct HttpMetricDataClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpMetricDataClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build metrics backend HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl MetricDataClient for HttpMetricDataClient {
    async fn get_metric_data(&self, input: &GetMetricDataInput) -> Result<GetMetricDataOutput> {
        let url = format!("{}/GetMetricData", self.base_url);
        let mut req = self.http.post(&url).json(input);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("HTTP request to {url} failed"))?;

        if !resp.status().is_success() {
            return Err(anyhow!("metrics backend returned status {}", resp.status()));
        }

        resp.json::<GetMetricDataOutput>()
            .await
            .context("Failed to parse GetMetricData response")
    }
}

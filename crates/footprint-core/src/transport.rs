//! Network boundary: one GET per attempt, body decoded as a JSON array of records.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;

use crate::config::FetchConfig;
use crate::error::AttemptError;
use crate::store::Record;
use crate::task::UnitTask;

/// The API authenticates on the password half of Basic auth; the user name is ignored.
pub const BASIC_AUTH_USER: &str = "any-user";

/// Connect timeout, independent of the total per-request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest body excerpt kept in a status error message
const BODY_EXCERPT_CHARS: usize = 200;

/// Performs a single network attempt for a unit.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, task: &UnitTask) -> Result<Vec<Record>, AttemptError>;
}

/// reqwest-backed transport with a fixed credential and total timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.request_timeout))
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.max_concurrent)
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, task: &UnitTask) -> Result<Vec<Record>, AttemptError> {
        let resp = self
            .client
            .get(&task.endpoint)
            .basic_auth(BASIC_AUTH_USER, Some(&self.api_key))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AttemptError::Status {
                code: status.as_u16(),
                message: status_message(status, &body),
            });
        }

        let bytes = resp.bytes().await.map_err(AttemptError::from_reqwest)?;
        decode_records(&bytes)
    }
}

/// Decode a response body as a JSON array of flat objects
pub fn decode_records(body: &[u8]) -> Result<Vec<Record>, AttemptError> {
    serde_json::from_slice(body).map_err(|e| AttemptError::Decode(e.to_string()))
}

/// Canonical reason phrase plus a short excerpt of the body, if any
fn status_message(status: reqwest::StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("");
    let excerpt: String = body.trim().chars().take(BODY_EXCERPT_CHARS).collect();
    match (reason.is_empty(), excerpt.is_empty()) {
        (_, true) => reason.to_string(),
        (true, false) => excerpt,
        (false, false) => format!("{reason} ({excerpt})"),
    }
}

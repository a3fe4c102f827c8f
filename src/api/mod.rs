// Tencent Cloud machine translation API plumbing
//
// - signer: TC3-HMAC-SHA256 Authorization header
// - types: request bodies and response envelopes
// - ApiClient: signed POSTs with bounded retry, backoff and request throttling

pub mod signer;
pub mod types;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use signer::{Credentials, Signer};
pub use types::Action;

use crate::config::ApiConfig;
use crate::error::{Result, SubtransError};
use types::{ApiErrorBody, Envelope};

/// Minimal HTTP seam so the client can run against scripted responses
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `body` to `url` and return the raw response body
    async fn post(&self, url: &str, headers: &[(&'static str, String)], body: String) -> Result<String>;
}

/// reqwest-backed transport, one connection pool per pipeline run
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, url: &str, headers: &[(&'static str, String)], body: String) -> Result<String> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            debug!("API answered HTTP {}", status);
        }
        Ok(text)
    }
}

/// One signed attempt. Rebuilt for every attempt so the timestamp is always fresh.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub action: Action,
    pub payload: String,
    pub timestamp: i64,
    pub authorization: String,
}

impl SignedRequest {
    pub fn new(signer: &Signer, action: Action, payload: &str, timestamp: i64) -> Self {
        Self {
            action,
            payload: payload.to_string(),
            timestamp,
            authorization: signer.authorization(payload, timestamp),
        }
    }

    pub fn headers(&self, host: &str, version: &str, region: &str) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", self.authorization.clone()),
            ("Content-Type", "application/json".to_string()),
            ("Host", host.to_string()),
            ("X-TC-Action", self.action.as_str().to_string()),
            ("X-TC-Timestamp", self.timestamp.to_string()),
            ("X-TC-Version", version.to_string()),
            ("X-TC-Region", region.to_string()),
        ]
    }
}

/// Signed API client. Failures never escape `call`; they end in an empty response.
pub struct ApiClient {
    transport: Box<dyn HttpTransport>,
    signer: Signer,
    config: ApiConfig,
    last_request: Mutex<Option<Instant>>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, credentials: Credentials) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::with_transport(config, credentials, Box::new(transport)))
    }

    pub fn with_transport(
        config: ApiConfig,
        credentials: Credentials,
        transport: Box<dyn HttpTransport>,
    ) -> Self {
        let signer = Signer::new(credentials, config.endpoint.clone(), config.service.clone());
        Self {
            transport,
            signer,
            config,
            last_request: Mutex::new(None),
        }
    }

    /// Invoke `action` with `payload`, retrying up to `retry_limit` times.
    /// Returns the `Response` object, or an empty map once retries are exhausted.
    pub async fn call<P: Serialize + Sync>(&self, action: Action, payload: &P) -> Map<String, Value> {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to serialize {} payload: {}", action.as_str(), e);
                return Map::new();
            }
        };

        let attempts = self.config.retry_limit;
        for attempt in 0..attempts {
            self.throttle().await;

            let delay = match self.attempt(action, &body).await {
                Ok(response) => return response,
                Err(SubtransError::Api { code, message }) => {
                    warn!(
                        "{} API error (attempt {}/{}): {} {}",
                        action.as_str(),
                        attempt + 1,
                        attempts,
                        code,
                        message
                    );
                    self.config.api_backoff() * 2u32.saturating_pow(attempt.min(16))
                }
                Err(e) => {
                    warn!(
                        "{} request failed (attempt {}/{}): {}",
                        action.as_str(),
                        attempt + 1,
                        attempts,
                        e
                    );
                    self.config.transport_backoff()
                }
            };

            if attempt + 1 < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        warn!("{} gave up after {} attempts", action.as_str(), attempts);
        Map::new()
    }

    async fn attempt(&self, action: Action, body: &str) -> Result<Map<String, Value>> {
        let timestamp = chrono::Utc::now().timestamp();
        let request = SignedRequest::new(&self.signer, action, body, timestamp);
        let headers = request.headers(self.signer.host(), &self.config.version, &self.config.region);
        let url = format!("https://{}/", self.config.endpoint);

        debug!("Sending {} request ({} bytes) to {}", action.as_str(), body.len(), url);
        let raw = self.transport.post(&url, &headers, request.payload).await?;

        let envelope: Envelope = serde_json::from_str(&raw)?;
        if let Some(error) = envelope.response.get("Error") {
            let error: ApiErrorBody = serde_json::from_value(error.clone())?;
            return Err(SubtransError::Api {
                code: error.code,
                message: error.message,
            });
        }
        Ok(envelope.response)
    }

    /// Keep request starts at least `1 / requests_per_second` apart
    async fn throttle(&self) {
        let interval = self.config.min_request_interval();
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SubtransError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub translate: TranslateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Host of the machine translation endpoint
    pub endpoint: String,
    /// Region sent in the X-TC-Region header
    pub region: String,
    /// Service identifier used in the signing scope
    pub service: String,
    /// API version sent in the X-TC-Version header
    pub version: String,
    /// Project id attached to every request body
    pub project_id: i64,
    /// Maximum attempts per API call
    pub retry_limit: u32,
    /// Base delay for API-level errors, doubled on every attempt
    pub api_backoff_secs: f64,
    /// Flat delay after transport or parse failures
    pub transport_backoff_secs: f64,
    /// HTTP request timeout
    pub timeout_secs: u64,
    /// Upper bound on request starts per second
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Source language code, `auto` lets the service decide
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Number of subtitle entries sent in one request
    pub batch_size: usize,
    /// Reconciliation mode
    pub mode: TranslationMode,
    /// Number of batches allowed in flight at once
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationMode {
    /// Batch: join a batch into one request and split the answer by line
    Batch,
    /// PerEntry: simplify Chinese entries locally, detect and translate the rest one by one
    PerEntry,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "tmt.tencentcloudapi.com".to_string(),
            region: "ap-beijing".to_string(),
            service: "tmt".to_string(),
            version: "2018-03-21".to_string(),
            project_id: 0,
            retry_limit: 3,
            api_backoff_secs: 1.0,
            transport_backoff_secs: 3.0,
            timeout_secs: 30,
            requests_per_second: 5,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            source_language: "auto".to_string(),
            target_language: "zh".to_string(),
            batch_size: 5,
            mode: TranslationMode::Batch,
            concurrency: 1,
        }
    }
}

impl ApiConfig {
    pub fn api_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.api_backoff_secs.max(0.0))
    }

    pub fn transport_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.transport_backoff_secs.max(0.0))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Minimum spacing between two request starts
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs(1) / self.requests_per_second.max(1)
    }
}

impl TranslationMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode.to_lowercase().as_str() {
            "batch" => Ok(Self::Batch),
            "per-entry" | "entry" => Ok(Self::PerEntry),
            _ => Err(SubtransError::Config(format!(
                "Invalid translation mode '{}'. Valid modes: batch, per-entry",
                mode
            ))),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubtransError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubtransError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubtransError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubtransError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.translate.batch_size == 0 {
            return Err(SubtransError::Config("batch_size must be at least 1".to_string()));
        }
        if self.translate.concurrency == 0 {
            return Err(SubtransError::Config("concurrency must be at least 1".to_string()));
        }
        if self.api.retry_limit == 0 {
            return Err(SubtransError::Config("retry_limit must be at least 1".to_string()));
        }
        if self.api.requests_per_second == 0 {
            return Err(SubtransError::Config(
                "requests_per_second must be at least 1".to_string(),
            ));
        }
        if self.api.endpoint.trim().is_empty() {
            return Err(SubtransError::Config("endpoint must not be empty".to_string()));
        }
        if self.translate.target_language.trim().is_empty() {
            return Err(SubtransError::Config("target_language must not be empty".to_string()));
        }
        Ok(())
    }
}

// Translation layer
//
// - tencent: Translator backed by the Tencent Cloud TMT API
// - script: local traditional to simplified Chinese conversion
// - batch: maps subtitle entries onto translation requests and back

pub mod batch;
pub mod script;
pub mod tencent;

use async_trait::async_trait;

pub use batch::{BatchOutcome, BatchReconciler};
pub use tencent::TencentTranslator;

use crate::api::{ApiClient, Credentials};
use crate::config::ApiConfig;
use crate::error::Result;

/// Language code returned when detection is unavailable
pub const AUTO: &str = "auto";

/// A value that is always usable. `degraded` marks a fallback to the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub degraded: bool,
}

impl<T> Outcome<T> {
    pub fn fresh(value: T) -> Self {
        Self { value, degraded: false }
    }

    pub fn fallback(value: T) -> Self {
        Self { value, degraded: true }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            degraded: self.degraded,
        }
    }
}

/// Remote translation service. Implementations never fail: on error they
/// return a degraded outcome carrying a neutral value.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Detect the language of `text`, `auto` when unknown
    async fn detect_language(&self, text: &str) -> Outcome<String>;

    /// Translate `text`, returning `text` itself when translation fails
    async fn translate(&self, text: &str, source: &str, target: &str) -> Outcome<String>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create the Tencent translator with its own HTTP client
    pub fn create_translator(config: ApiConfig, credentials: Credentials) -> Result<Box<dyn Translator>> {
        let project_id = config.project_id;
        let client = ApiClient::new(config, credentials)?;
        Ok(Box::new(TencentTranslator::new(client, project_id)))
    }
}

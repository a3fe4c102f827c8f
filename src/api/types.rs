use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Remote action invoked through the X-TC-Action header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LanguageDetect,
    TextTranslate,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LanguageDetect => "LanguageDetect",
            Self::TextTranslate => "TextTranslate",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LanguageDetectRequest<'a> {
    pub text: &'a str,
    pub project_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextTranslateRequest<'a> {
    pub source_text: &'a str,
    pub source: &'a str,
    pub target: &'a str,
    pub project_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Response")]
    pub response: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LanguageDetectResponse {
    pub lang: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextTranslateResponse {
    pub target_text: String,
}

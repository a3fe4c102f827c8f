use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::{Outcome, Translator, AUTO};
use crate::api::types::{
    LanguageDetectRequest, LanguageDetectResponse, TextTranslateRequest, TextTranslateResponse,
};
use crate::api::{Action, ApiClient};

/// Tencent Cloud machine translation (TMT)
pub struct TencentTranslator {
    client: ApiClient,
    project_id: i64,
}

impl TencentTranslator {
    pub fn new(client: ApiClient, project_id: i64) -> Self {
        Self { client, project_id }
    }
}

#[async_trait]
impl Translator for TencentTranslator {
    async fn detect_language(&self, text: &str) -> Outcome<String> {
        let request = LanguageDetectRequest {
            text,
            project_id: self.project_id,
        };
        let response = self.client.call(Action::LanguageDetect, &request).await;

        match decode::<LanguageDetectResponse>(response) {
            Some(detected) if !detected.lang.is_empty() => Outcome::fresh(detected.lang),
            _ => Outcome::fallback(AUTO.to_string()),
        }
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Outcome<String> {
        if text.trim().is_empty() {
            return Outcome::fresh(text.to_string());
        }

        let request = TextTranslateRequest {
            source_text: text,
            source,
            target,
            project_id: self.project_id,
        };
        let response = self.client.call(Action::TextTranslate, &request).await;

        match decode::<TextTranslateResponse>(response) {
            Some(translated) => Outcome::fresh(translated.target_text),
            None => Outcome::fallback(text.to_string()),
        }
    }
}

fn decode<T: DeserializeOwned>(response: Map<String, Value>) -> Option<T> {
    if response.is_empty() {
        return None;
    }
    serde_json::from_value(Value::Object(response))
        .map_err(|e| debug!("Unexpected response shape: {}", e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, ScriptedTransport};

    #[tokio::test]
    async fn translate_returns_target_text() {
        let transport = ScriptedTransport::new(vec![Ok(
            r#"{"Response":{"TargetText":"早上好","Source":"en","Target":"zh","RequestId":"a"}}"#,
        )]);
        let translator = TencentTranslator::new(client(&transport, 3), 0);

        let outcome = translator.translate("Good morning", AUTO, "zh").await;
        assert_eq!(outcome, Outcome::fresh("早上好".to_string()));
    }

    #[tokio::test]
    async fn translate_falls_back_to_source_text() {
        let transport = ScriptedTransport::new(vec![Ok(
            r#"{"Response":{"Error":{"Code":"AuthFailure","Message":"bad signature"}}}"#,
        )]);
        let translator = TencentTranslator::new(client(&transport, 2), 0);

        let outcome = translator.translate("Good morning", AUTO, "zh").await;
        assert_eq!(outcome, Outcome::fallback("Good morning".to_string()));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn blank_text_skips_the_network() {
        let transport = ScriptedTransport::new(vec![Err("should not be called")]);
        let translator = TencentTranslator::new(client(&transport, 3), 0);

        let outcome = translator.translate("  ", AUTO, "zh").await;
        assert_eq!(outcome.value, "  ");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn detect_language_reads_lang() {
        let transport =
            ScriptedTransport::new(vec![Ok(r#"{"Response":{"Lang":"ja","RequestId":"b"}}"#)]);
        let translator = TencentTranslator::new(client(&transport, 3), 0);

        let outcome = translator.detect_language("こんにちは").await;
        assert_eq!(outcome, Outcome::fresh("ja".to_string()));

        let request = transport.requests.lock().unwrap()[0].clone();
        assert_eq!(request.body, r#"{"Text":"こんにちは","ProjectId":0}"#);
    }

    #[tokio::test]
    async fn detect_language_defaults_to_auto() {
        let transport = ScriptedTransport::new(vec![Err("network down")]);
        let translator = TencentTranslator::new(client(&transport, 3), 0);

        let outcome = translator.detect_language("Bonjour").await;
        assert_eq!(outcome, Outcome::fallback(AUTO.to_string()));
        assert_eq!(transport.request_count(), 3);
    }
}

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::provider::{redact_key, ProviderAdapter, PROBE_PROMPT};
use super::types::*;
use crate::config::Timeouts;
use crate::error::ProviderError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Google Gemini adapter (single-turn content generation, inline binary supported)
pub struct GeminiAdapter {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: Option<String>,
    timeouts: Timeouts,
}

impl GeminiAdapter {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Build generateContent URL.
    /// NOTE: Gemini API requires the key as a query parameter.
    /// Do not log URLs containing the API key.
    fn api_url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.as_deref().unwrap_or(GEMINI_BASE_URL),
            self.model,
            api_key
        )
    }

    /// Single user turn; context is folded into the prompt text
    fn build_chat_body(&self, prompt: &str, context: &Map<String, Value>) -> Value {
        let text = if context.is_empty() {
            prompt.to_string()
        } else {
            format!(
                "Application context (JSON): {}\n\n{}",
                Value::Object(context.clone()),
                prompt
            )
        };

        json!({
            "contents": [{"role": "user", "parts": [{"text": text}]}]
        })
    }

    fn build_extract_body(&self, prompt: &str, mime_type: &str, data_base64: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": prompt},
                    {"inlineData": {"mimeType": mime_type, "data": data_base64.trim()}}
                ]
            }]
        })
    }

    fn build_probe_body(&self) -> Value {
        json!({
            "contents": [{"role": "user", "parts": [{"text": PROBE_PROMPT}]}],
            "generationConfig": {"maxOutputTokens": 16}
        })
    }

    fn parse_response(&self, body: GeminiApiResponse) -> Result<ProviderResult, ProviderError> {
        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: ProviderName::Gemini,
                message: "no candidates in response".to_string(),
            })?;

        let text = candidate
            .content
            .and_then(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(ProviderResult::success(
            ProviderName::Gemini,
            text,
            usage_map(body.usage_metadata),
        ))
    }

    async fn generate(&self, body: Value, timeout: Duration) -> Result<ProviderResult, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey {
                provider: ProviderName::Gemini,
            })?;
        let secs = timeout.as_secs();

        let response = self
            .client
            .post(self.api_url(api_key))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(ProviderName::Gemini, secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: ProviderName::Gemini,
                status: status.as_u16(),
                body: redact_key(&error_body, api_key),
            });
        }

        let api_response: GeminiApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(ProviderName::Gemini, secs, e))?;
        self.parse_response(api_response)
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> ProviderName {
        ProviderName::Gemini
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_inline_binary(&self) -> bool {
        true
    }

    async fn chat(
        &self,
        prompt: &str,
        context: &Map<String, Value>,
    ) -> Result<ProviderResult, ProviderError> {
        let body = self.build_chat_body(prompt, context);
        self.generate(body, self.timeouts.chat).await
    }

    async fn extract(
        &self,
        prompt: &str,
        mime_type: &str,
        data_base64: &str,
    ) -> Result<ProviderResult, ProviderError> {
        let body = self.build_extract_body(prompt, mime_type, data_base64);
        self.generate(body, self.timeouts.chat).await
    }

    async fn ping(&self) -> HealthReport {
        if self.api_key.is_none() {
            return HealthReport::unhealthy(&self.model, "GEMINI_API_KEY not configured", None);
        }

        let started = Instant::now();
        let outcome = self.generate(self.build_probe_body(), self.timeouts.health).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) if !result.text.trim().is_empty() => {
                HealthReport::healthy(&self.model, latency_ms)
            }
            Ok(_) => HealthReport::unhealthy(&self.model, "empty probe response", Some(latency_ms)),
            Err(e) => HealthReport::unhealthy(&self.model, &e.to_string(), Some(latency_ms)),
        }
    }
}

// --- Gemini API response types ---

#[derive(Debug, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiApiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiCandidate {
    content: Option<GeminiApiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiContent {
    parts: Option<Vec<GeminiApiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiPart {
    text: Option<String>,
}

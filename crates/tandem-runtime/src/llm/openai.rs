use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::provider::{degraded_extraction_prompt, redact_key, ProviderAdapter, PROBE_PROMPT};
use super::types::*;
use crate::config::Timeouts;
use crate::error::ProviderError;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.3;

const SYSTEM_PERSONA: &str = "You are the assistant of a business credit application portal. \
Help applicants fill in their application, understand the required documents and review \
the data they entered. Answer concisely, in the applicant's language, and never invent \
figures that were not provided.";

/// OpenAI Chat Completions adapter (conversational style, no inline binary)
pub struct OpenAiAdapter {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: Option<String>,
    timeouts: Timeouts,
}

impl OpenAiAdapter {
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

    /// Custom base URL for OpenAI-compatible APIs (proxy, local LLM, tests)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn api_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_deref().unwrap_or(OPENAI_BASE_URL)
        )
    }

    /// Build request body: persona, optional context, user prompt
    fn build_request_body(&self, prompt: &str, context: &Map<String, Value>) -> Value {
        let mut messages = vec![json!({"role": "system", "content": SYSTEM_PERSONA})];

        if !context.is_empty() {
            messages.push(json!({
                "role": "system",
                "content": format!("Application context (JSON): {}", Value::Object(context.clone())),
            }));
        }

        messages.push(json!({"role": "user", "content": prompt}));

        json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": messages,
        })
    }

    fn build_probe_body(&self) -> Value {
        json!({
            "model": self.model,
            "max_tokens": 16,
            "messages": [{"role": "user", "content": PROBE_PROMPT}],
        })
    }

    fn parse_response(&self, body: ApiResponse) -> Result<ProviderResult, ProviderError> {
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: ProviderName::OpenAi,
                message: "no choices in response".to_string(),
            })?;

        Ok(ProviderResult::success(
            ProviderName::OpenAi,
            choice.message.content.unwrap_or_default(),
            usage_map(body.usage),
        ))
    }

    async fn complete(&self, body: Value, timeout: Duration) -> Result<ProviderResult, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey {
                provider: ProviderName::OpenAi,
            })?;
        let secs = timeout.as_secs();

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(ProviderName::OpenAi, secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: ProviderName::OpenAi,
                status: status.as_u16(),
                body: redact_key(&error_body, api_key),
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(ProviderName::OpenAi, secs, e))?;
        self.parse_response(api_response)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> ProviderName {
        ProviderName::OpenAi
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_inline_binary(&self) -> bool {
        false
    }

    async fn chat(
        &self,
        prompt: &str,
        context: &Map<String, Value>,
    ) -> Result<ProviderResult, ProviderError> {
        let body = self.build_request_body(prompt, context);
        self.complete(body, self.timeouts.chat).await
    }

    async fn extract(
        &self,
        prompt: &str,
        mime_type: &str,
        _data_base64: &str,
    ) -> Result<ProviderResult, ProviderError> {
        tracing::debug!(mime_type, "OpenAI has no inline binary support, sending prompt only");
        let degraded = degraded_extraction_prompt(prompt, mime_type);
        let body = self.build_request_body(&degraded, &Map::new());
        self.complete(body, self.timeouts.chat).await
    }

    async fn ping(&self) -> HealthReport {
        if self.api_key.is_none() {
            return HealthReport::unhealthy(&self.model, "OPENAI_API_KEY not configured", None);
        }

        let started = Instant::now();
        let outcome = self.complete(self.build_probe_body(), self.timeouts.health).await;
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

/// OpenAI API response structures
#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

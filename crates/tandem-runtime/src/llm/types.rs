use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::GatewayError;

/// Default media type for extraction payloads
pub const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// Maximum length of error text carried in health reasons and audit rows
pub const MAX_REASON_CHARS: usize = 120;

/// The closed set of LLM vendors the gateway routes between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ProviderName {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
}

impl ProviderName {
    pub const ALL: [ProviderName; 2] = [ProviderName::OpenAi, ProviderName::Gemini];

    /// The one other provider in the set
    pub fn alternate(self) -> Self {
        match self {
            ProviderName::OpenAi => ProviderName::Gemini,
            ProviderName::Gemini => ProviderName::OpenAi,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderName::OpenAi => "openai",
            ProviderName::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderName::OpenAi),
            "gemini" => Ok(ProviderName::Gemini),
            other => Err(GatewayError::UnknownProvider(other.to_string())),
        }
    }
}

/// Same rules as `FromStr`, so config files and env vars accept the same spellings
impl<'de> Deserialize<'de> for ProviderName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Conversational request routed through the dispatcher
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub prompt: String,
    pub context: Map<String, Value>,
    pub provider_preference: Option<ProviderName>,
    /// Test-only fault injection: treat calls to this provider as failed
    pub simulate_fail_on: Option<ProviderName>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: Map::new(),
            provider_preference: None,
            simulate_fail_on: None,
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_provider(mut self, provider: ProviderName) -> Self {
        self.provider_preference = Some(provider);
        self
    }

    pub fn simulate_fail_on(mut self, provider: ProviderName) -> Self {
        self.simulate_fail_on = Some(provider);
        self
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.prompt.trim().is_empty() {
            return Err(GatewayError::invalid("prompt_required", "prompt is required"));
        }
        Ok(())
    }
}

/// Document extraction request: a prompt plus an inline binary payload
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub prompt: String,
    pub mime_type: String,
    pub data_base64: String,
    pub simulate_fail_on: Option<ProviderName>,
}

impl ExtractionRequest {
    pub fn new(prompt: impl Into<String>, data_base64: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            data_base64: data_base64.into(),
            simulate_fail_on: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn simulate_fail_on(mut self, provider: ProviderName) -> Self {
        self.simulate_fail_on = Some(provider);
        self
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        use base64::Engine;

        if self.prompt.trim().is_empty() {
            return Err(GatewayError::invalid("prompt_required", "prompt is required"));
        }
        if self.data_base64.trim().is_empty() {
            return Err(GatewayError::invalid(
                "data_base64_required",
                "dataBase64 is required",
            ));
        }
        base64::engine::general_purpose::STANDARD
            .decode(self.data_base64.trim())
            .map_err(|e| {
                GatewayError::invalid(
                    "invalid_data_base64",
                    format!("dataBase64 is not valid base64: {}", e),
                )
            })?;
        Ok(())
    }
}

/// Normalized outcome of one provider call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult {
    pub ok: bool,
    pub text: String,
    pub provider_used: ProviderName,
    /// Vendor usage object, passed through as-is
    pub usage: Map<String, Value>,
}

impl ProviderResult {
    pub fn success(provider: ProviderName, text: impl Into<String>, usage: Map<String, Value>) -> Self {
        Self {
            ok: true,
            text: text.into(),
            provider_used: provider,
            usage,
        }
    }
}

/// Provider result plus failover metadata, as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResponse {
    #[serde(flatten)]
    pub result: ProviderResult,
    pub failover: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failover_from: Option<ProviderName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failover_to: Option<ProviderName>,
}

impl UnifiedResponse {
    pub fn direct(result: ProviderResult) -> Self {
        Self {
            result,
            failover: false,
            failover_from: None,
            failover_to: None,
        }
    }

    pub fn via_failover(result: ProviderResult, from: ProviderName) -> Self {
        let to = result.provider_used;
        Self {
            result,
            failover: true,
            failover_from: Some(from),
            failover_to: Some(to),
        }
    }

    pub fn provider_used(&self) -> ProviderName {
        self.result.provider_used
    }

    pub fn text(&self) -> &str {
        &self.result.text
    }
}

/// Per-provider probe outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthReport {
    pub fn healthy(model: &str, latency_ms: u64) -> Self {
        Self {
            healthy: true,
            reason: None,
            model: Some(model.to_string()),
            latency_ms: Some(latency_ms),
        }
    }

    pub fn unhealthy(model: &str, reason: &str, latency_ms: Option<u64>) -> Self {
        Self {
            healthy: false,
            reason: Some(truncate_chars(reason, MAX_REASON_CHARS)),
            model: Some(model.to_string()),
            latency_ms,
        }
    }
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Coerce a vendor usage value into an object map
pub(crate) fn usage_map(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

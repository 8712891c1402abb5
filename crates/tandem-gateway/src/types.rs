use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tandem_runtime::{ChatRequest, ExtractionRequest, GatewayError, ProviderName};

/// `POST /llm-chat` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
    #[serde(default)]
    pub provider_preference: Option<String>,
    #[serde(default)]
    pub simulate_fail_on: Option<String>,
}

impl ChatBody {
    pub fn into_request(self) -> Result<ChatRequest, GatewayError> {
        let provider_preference = non_empty(self.provider_preference)
            .map(|p| p.parse::<ProviderName>())
            .transpose()?;

        Ok(ChatRequest {
            prompt: self.prompt.unwrap_or_default(),
            context: self.context.unwrap_or_default(),
            provider_preference,
            simulate_fail_on: parse_simulate_fail_on(self.simulate_fail_on)?,
        })
    }
}

/// `POST /llm-extract` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data_base64: Option<String>,
    #[serde(default)]
    pub simulate_fail_on: Option<String>,
}

impl ExtractBody {
    pub fn into_request(self) -> Result<ExtractionRequest, GatewayError> {
        let mut request = ExtractionRequest::new(
            self.prompt.unwrap_or_default(),
            self.data_base64.unwrap_or_default(),
        );
        if let Some(mime_type) = non_empty(self.mime_type) {
            request = request.with_mime_type(mime_type);
        }
        request.simulate_fail_on = parse_simulate_fail_on(self.simulate_fail_on)?;
        Ok(request)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_simulate_fail_on(value: Option<String>) -> Result<Option<ProviderName>, GatewayError> {
    non_empty(value)
        .map(|v| {
            v.parse::<ProviderName>().map_err(|_| {
                GatewayError::invalid(
                    "invalid_simulate_fail_on",
                    format!("simulateFailOn must be one of openai, gemini (got '{}')", v),
                )
            })
        })
        .transpose()
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    pub code: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

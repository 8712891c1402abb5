use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::{HealthReport, ProviderName, ProviderResult};
use crate::error::ProviderError;

/// Fixed prompt used by health probes
pub const PROBE_PROMPT: &str = "Reply with the single word: ok";

/// Provider adapter trait - one implementation per LLM vendor
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which vendor this adapter talks to
    fn name(&self) -> ProviderName;

    /// Model identifier for logging/health reports
    fn model_name(&self) -> &str;

    /// Whether the vendor accepts inline binary attachments
    fn supports_inline_binary(&self) -> bool;

    /// Conversational call with optional opaque context
    async fn chat(
        &self,
        prompt: &str,
        context: &Map<String, Value>,
    ) -> Result<ProviderResult, ProviderError>;

    /// Prompt plus base64 payload; vendors without inline binary degrade to prompt-only
    async fn extract(
        &self,
        prompt: &str,
        mime_type: &str,
        data_base64: &str,
    ) -> Result<ProviderResult, ProviderError>;

    /// Minimal probe; never fails, errors become `healthy: false`
    async fn ping(&self) -> HealthReport;
}

/// The two configured adapters, looked up by provider name
#[derive(Clone)]
pub struct ProviderSet {
    openai: Arc<dyn ProviderAdapter>,
    gemini: Arc<dyn ProviderAdapter>,
}

impl ProviderSet {
    pub fn new(openai: Arc<dyn ProviderAdapter>, gemini: Arc<dyn ProviderAdapter>) -> Self {
        debug_assert_eq!(openai.name(), ProviderName::OpenAi);
        debug_assert_eq!(gemini.name(), ProviderName::Gemini);
        Self { openai, gemini }
    }

    pub fn get(&self, name: ProviderName) -> &Arc<dyn ProviderAdapter> {
        match name {
            ProviderName::OpenAi => &self.openai,
            ProviderName::Gemini => &self.gemini,
        }
    }
}

/// Note appended to prompts when a vendor cannot receive the attached file
pub fn degraded_extraction_prompt(prompt: &str, mime_type: &str) -> String {
    format!(
        "{}\n\n[Note: the attached file ({}) could not be sent to this provider, so its \
         content is unavailable. Answer from the prompt alone and state that the document \
         could not be read.]",
        prompt, mime_type
    )
}

/// Remove an API key from text before it is logged or returned
pub(crate) fn redact_key(body: &str, key: &str) -> String {
    if key.chars().count() > 4 {
        let prefix: String = key.chars().take(4).collect();
        body.replace(key, &format!("{}...", prefix))
    } else {
        body.to_string()
    }
}

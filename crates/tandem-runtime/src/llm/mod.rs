pub mod failover;
pub mod gemini;
pub mod health;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder};

pub use failover::FailoverDispatcher;
pub use gemini::GeminiAdapter;
pub use health::{HealthProber, StatusReport};
pub use openai::OpenAiAdapter;
pub use provider::{ProviderAdapter, ProviderSet};
pub use types::{
    ChatRequest, ExtractionRequest, HealthReport, ProviderName, ProviderResult, UnifiedResponse,
};

use crate::config::GatewayConfig;

/// Shared HTTP client; per-call timeouts are set on each request
pub fn http_client() -> Result<Client> {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

/// Build both vendor adapters from configuration
pub fn build_providers(config: &GatewayConfig, client: &Client) -> ProviderSet {
    let timeouts = config.timeouts();

    let mut openai = OpenAiAdapter::new(client.clone(), config.openai.api_key.clone())
        .with_timeouts(timeouts);
    if !config.openai.model.is_empty() {
        openai = openai.with_model(&config.openai.model);
    }
    if let Some(ref url) = config.openai.base_url {
        openai = openai.with_base_url(url);
    }

    let mut gemini = GeminiAdapter::new(client.clone(), config.gemini.api_key.clone())
        .with_timeouts(timeouts);
    if !config.gemini.model.is_empty() {
        gemini = gemini.with_model(&config.gemini.model);
    }
    if let Some(ref url) = config.gemini.base_url {
        gemini = gemini.with_base_url(url);
    }

    ProviderSet::new(Arc::new(openai), Arc::new(gemini))
}

//! Shared test helpers: mock provider adapters, test AppState factory, request driver.
#![allow(dead_code)] // helpers used across multiple test crates

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use tower::ServiceExt;

use tandem_gateway::{create_router, AppState, AuthConfig};
use tandem_runtime::audit::AuditLogger;
use tandem_runtime::llm::provider::degraded_extraction_prompt;
use tandem_runtime::{
    FailoverDispatcher, Gateway, HealthProber, HealthReport, ProviderAdapter, ProviderError,
    ProviderName, ProviderResult, ProviderSet,
};

/// Mock provider adapter that echoes input and counts calls (no network)
pub struct MockAdapter {
    pub name: ProviderName,
    pub should_fail: bool,
    pub inline_binary: bool,
    pub calls: AtomicUsize,
}

impl MockAdapter {
    pub fn new(name: ProviderName, should_fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            should_fail,
            // Mirrors the real vendors: only Gemini takes inline files
            inline_binary: name == ProviderName::Gemini,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, text: String) -> Result<ProviderResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ProviderError::Api {
                provider: self.name,
                status: 500,
                body: "internal vendor stack trace".to_string(),
            });
        }
        let mut usage = Map::new();
        usage.insert("total_tokens".into(), Value::from(3));
        Ok(ProviderResult::success(self.name, text, usage))
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn name(&self) -> ProviderName {
        self.name
    }

    fn model_name(&self) -> &str {
        "mock"
    }

    fn supports_inline_binary(&self) -> bool {
        self.inline_binary
    }

    async fn chat(
        &self,
        prompt: &str,
        _context: &Map<String, Value>,
    ) -> Result<ProviderResult, ProviderError> {
        self.respond(format!("mock response to: {}", prompt))
    }

    async fn extract(
        &self,
        prompt: &str,
        mime_type: &str,
        data_base64: &str,
    ) -> Result<ProviderResult, ProviderError> {
        if self.inline_binary {
            self.respond(format!("read {} bytes of {}", data_base64.len(), mime_type))
        } else {
            self.respond(degraded_extraction_prompt(prompt, mime_type))
        }
    }

    async fn ping(&self) -> HealthReport {
        if self.should_fail {
            HealthReport::unhealthy("mock", "connection refused", None)
        } else {
            HealthReport::healthy("mock", 1)
        }
    }
}

/// Test harness: router state plus handles on both mock adapters
pub struct TestApp {
    pub state: AppState,
    pub openai: Arc<MockAdapter>,
    pub gemini: Arc<MockAdapter>,
}

impl TestApp {
    /// Primary is openai unless stated otherwise
    pub fn new(openai_fails: bool, gemini_fails: bool, failover_enabled: bool) -> Self {
        Self::build(openai_fails, gemini_fails, failover_enabled, None)
    }

    pub fn with_token(token: &str) -> Self {
        Self::build(false, false, true, Some(token.to_string()))
    }

    fn build(
        openai_fails: bool,
        gemini_fails: bool,
        failover_enabled: bool,
        token: Option<String>,
    ) -> Self {
        let openai = MockAdapter::new(ProviderName::OpenAi, openai_fails);
        let gemini = MockAdapter::new(ProviderName::Gemini, gemini_fails);
        let providers = ProviderSet::new(openai.clone(), gemini.clone());

        let dispatcher = FailoverDispatcher::new(
            providers.clone(),
            ProviderName::OpenAi,
            failover_enabled,
            AuditLogger::disabled(),
        );
        let prober = HealthProber::new(providers, failover_enabled);
        let state = AppState::new(Gateway::new(dispatcher, prober)).with_auth(AuthConfig::new(token));

        Self {
            state,
            openai,
            gemini,
        }
    }

    /// Call the router, return (status, parsed JSON body)
    pub async fn call(&self, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        self.call_with_headers(method, uri, body, &[]).await
    }

    pub async fn call_with_headers(
        &self,
        method: &str,
        uri: &str,
        body: Option<&str>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let app = create_router(self.state.clone());

        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(json.to_string())).unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

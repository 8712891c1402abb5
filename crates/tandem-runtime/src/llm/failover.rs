//! Two-provider failover dispatch.
//!
//! Each request tries its primary provider exactly once and, when failover
//! is enabled, the alternate exactly once. The attempts are sequential.
//! There is no state carried between requests.

use serde_json::{Map, Value};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::provider::ProviderSet;
use super::types::*;
use crate::audit::{AuditAction, AuditEvent, AuditLogger};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, ProviderError};

/// Work item forwarded to a provider adapter
enum Job<'a> {
    Chat {
        prompt: &'a str,
        context: &'a Map<String, Value>,
    },
    Extract {
        prompt: &'a str,
        mime_type: &'a str,
        data_base64: &'a str,
    },
}

impl Job<'_> {
    fn operation(&self) -> &'static str {
        match self {
            Job::Chat { .. } => "chat",
            Job::Extract { .. } => "extract",
        }
    }
}

/// Single entry point enforcing the primary/alternate policy
#[derive(Clone)]
pub struct FailoverDispatcher {
    providers: ProviderSet,
    primary: ProviderName,
    failover_enabled: bool,
    audit: AuditLogger,
}

impl FailoverDispatcher {
    pub fn new(
        providers: ProviderSet,
        primary: ProviderName,
        failover_enabled: bool,
        audit: AuditLogger,
    ) -> Self {
        Self {
            providers,
            primary,
            failover_enabled,
            audit,
        }
    }

    pub fn from_config(config: &GatewayConfig, providers: ProviderSet, audit: AuditLogger) -> Self {
        Self::new(
            providers,
            config.routing.primary,
            config.routing.failover_enabled,
            audit,
        )
    }

    /// Configured default primary
    pub fn primary(&self) -> ProviderName {
        self.primary
    }

    /// Wait for audit writes still in flight
    pub async fn flush_audit(&self) -> usize {
        self.audit.flush().await
    }

    pub async fn dispatch_chat(&self, request: &ChatRequest) -> Result<UnifiedResponse, GatewayError> {
        request.validate()?;
        let primary = request.provider_preference.unwrap_or(self.primary);
        let job = Job::Chat {
            prompt: &request.prompt,
            context: &request.context,
        };
        self.dispatch(job, primary, request.simulate_fail_on).await
    }

    pub async fn dispatch_extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<UnifiedResponse, GatewayError> {
        request.validate()?;
        let job = Job::Extract {
            prompt: &request.prompt,
            mime_type: &request.mime_type,
            data_base64: &request.data_base64,
        };
        self.dispatch(job, self.primary, request.simulate_fail_on).await
    }

    async fn dispatch(
        &self,
        job: Job<'_>,
        primary: ProviderName,
        simulate_fail_on: Option<ProviderName>,
    ) -> Result<UnifiedResponse, GatewayError> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            operation = job.operation(),
            primary = %primary
        );

        async move {
            let primary_err = match self.attempt(primary, &job, simulate_fail_on).await {
                Ok(result) => {
                    let response = UnifiedResponse::direct(result);
                    info!(provider = %primary, "Request served by primary provider");
                    self.record(
                        AuditEvent::new(AuditAction::ProviderSelection)
                            .transition(None, Some(primary))
                            .with_data("request_id", request_id.as_str())
                            .with_data("operation", job.operation())
                            .with_data("provider", primary.as_str())
                            .with_data("model", self.providers.get(primary).model_name()),
                    );
                    return Ok(response);
                }
                Err(e) => e,
            };

            warn!(
                provider = %primary,
                kind = primary_err.kind(),
                error = %primary_err,
                "Primary provider failed"
            );

            if !self.failover_enabled {
                return Err(GatewayError::PrimaryFailed {
                    provider: primary,
                    source: primary_err,
                });
            }

            let alternate = primary.alternate();
            match self.attempt(alternate, &job, simulate_fail_on).await {
                Ok(result) => {
                    let response = UnifiedResponse::via_failover(result, primary);
                    info!(from = %primary, to = %alternate, "Request served after failover");
                    self.record(
                        AuditEvent::new(AuditAction::Failover)
                            .transition(Some(primary), Some(alternate))
                            .with_data("request_id", request_id.as_str())
                            .with_data("operation", job.operation())
                            .with_data("model", self.providers.get(alternate).model_name())
                            .with_error("primary", &primary_err.to_string()),
                    );
                    Ok(response)
                }
                Err(alternate_err) => {
                    warn!(
                        provider = %alternate,
                        kind = alternate_err.kind(),
                        error = %alternate_err,
                        "Alternate provider failed, giving up"
                    );
                    self.record(
                        AuditEvent::new(AuditAction::FailoverFailed)
                            .transition(Some(primary), Some(alternate))
                            .with_data("request_id", request_id.as_str())
                            .with_data("operation", job.operation())
                            .with_error("primary", &primary_err.to_string())
                            .with_error("alternate", &alternate_err.to_string()),
                    );
                    Err(GatewayError::AllProvidersFailed { primary, alternate })
                }
            }
        }
        .instrument(span)
        .await
    }

    /// One attempt against one provider. Simulated failures short-circuit
    /// before the adapter is touched.
    async fn attempt(
        &self,
        provider: ProviderName,
        job: &Job<'_>,
        simulate_fail_on: Option<ProviderName>,
    ) -> Result<ProviderResult, ProviderError> {
        if simulate_fail_on == Some(provider) {
            return Err(ProviderError::Simulated(provider));
        }

        let adapter = self.providers.get(provider);
        match job {
            Job::Chat { prompt, context } => adapter.chat(prompt, context).await,
            Job::Extract {
                prompt,
                mime_type,
                data_base64,
            } => {
                debug!(
                    provider = %provider,
                    mime_type = *mime_type,
                    inline_binary = adapter.supports_inline_binary(),
                    "Sending extraction"
                );
                adapter.extract(prompt, mime_type, data_base64).await
            }
        }
    }

    fn record(&self, event: AuditEvent) {
        // Delivery outcome is not part of the response
        self.audit.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditSink;
    use crate::llm::openai::OpenAiAdapter;
    use crate::llm::provider::ProviderAdapter;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Mock adapter that counts calls
    struct MockAdapter {
        name: ProviderName,
        should_fail: bool,
        calls: AtomicUsize,
    }

    impl MockAdapter {
        fn new(name: ProviderName, should_fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                should_fail,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond(&self, text: String) -> Result<ProviderResult, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(ProviderError::Api {
                    provider: self.name,
                    status: 503,
                    body: "overloaded".into(),
                })
            } else {
                Ok(ProviderResult::success(self.name, text, Map::new()))
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockAdapter {
        fn name(&self) -> ProviderName {
            self.name
        }
        fn model_name(&self) -> &str {
            "mock-model"
        }
        fn supports_inline_binary(&self) -> bool {
            true
        }
        async fn chat(
            &self,
            prompt: &str,
            _context: &Map<String, Value>,
        ) -> Result<ProviderResult, ProviderError> {
            self.respond(format!("{} says: {}", self.name, prompt))
        }
        async fn extract(
            &self,
            _prompt: &str,
            mime_type: &str,
            _data_base64: &str,
        ) -> Result<ProviderResult, ProviderError> {
            self.respond(format!("{} extracted {}", self.name, mime_type))
        }
        async fn ping(&self) -> HealthReport {
            HealthReport::healthy("mock-model", 1)
        }
    }

    #[derive(Default)]
    struct MemorySink {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for MemorySink {
        fn name(&self) -> &str {
            "memory"
        }
        async fn write(&self, event: &AuditEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }
        async fn write(&self, _event: &AuditEvent) -> Result<()> {
            Err(anyhow!("audit down"))
        }
    }

    struct Fixture {
        openai: Arc<MockAdapter>,
        gemini: Arc<MockAdapter>,
        sink: Arc<MemorySink>,
        dispatcher: FailoverDispatcher,
    }

    fn fixture(openai_fails: bool, gemini_fails: bool, failover_enabled: bool) -> Fixture {
        let openai = MockAdapter::new(ProviderName::OpenAi, openai_fails);
        let gemini = MockAdapter::new(ProviderName::Gemini, gemini_fails);
        let sink = Arc::new(MemorySink::default());
        let dispatcher = FailoverDispatcher::new(
            ProviderSet::new(openai.clone(), gemini.clone()),
            ProviderName::OpenAi,
            failover_enabled,
            AuditLogger::new(sink.clone()),
        );
        Fixture {
            openai,
            gemini,
            sink,
            dispatcher,
        }
    }

    /// Audit writes are detached; flush before reading the sink
    async fn flushed_events(fx: &Fixture) -> Vec<AuditEvent> {
        fx.dispatcher.flush_audit().await;
        fx.sink.events.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_healthy_primary_serves_request() {
        let fx = fixture(false, false, true);

        let resp = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new("Say ok"))
            .await
            .unwrap();

        assert!(resp.result.ok);
        assert!(!resp.failover);
        assert_eq!(resp.provider_used(), ProviderName::OpenAi);
        assert!(!resp.text().is_empty());
        assert_eq!(fx.gemini.calls(), 0);

        let events = flushed_events(&fx).await;
        assert_eq!(events[0].action, AuditAction::ProviderSelection);
        assert_eq!(events[0].next, Some(ProviderName::OpenAi));
    }

    #[tokio::test]
    async fn test_simulated_primary_failure_fails_over() {
        let fx = fixture(false, false, true);

        let resp = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new("Say ok").simulate_fail_on(ProviderName::OpenAi))
            .await
            .unwrap();

        assert!(resp.failover);
        assert_eq!(resp.failover_from, Some(ProviderName::OpenAi));
        assert_eq!(resp.failover_to, Some(ProviderName::Gemini));
        assert_eq!(resp.provider_used(), ProviderName::Gemini);
        // Short-circuit happens before the adapter call
        assert_eq!(fx.openai.calls(), 0);
        assert_eq!(fx.gemini.calls(), 1);

        let events = flushed_events(&fx).await;
        assert_eq!(events[0].action, AuditAction::Failover);
        let errors = events[0].errors.as_ref().unwrap();
        assert_eq!(errors["primary"], "Simulated failure on openai");
    }

    #[tokio::test]
    async fn test_failover_is_symmetric() {
        let fx = fixture(false, false, true);

        let a = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new("hi").simulate_fail_on(ProviderName::OpenAi))
            .await
            .unwrap();
        let b = fx
            .dispatcher
            .dispatch_chat(
                &ChatRequest::new("hi")
                    .with_provider(ProviderName::Gemini)
                    .simulate_fail_on(ProviderName::Gemini),
            )
            .await
            .unwrap();

        assert_eq!(a.provider_used(), ProviderName::Gemini);
        assert_eq!(b.provider_used(), ProviderName::OpenAi);
        assert_eq!(a.failover_from, b.failover_to);
        assert_eq!(a.failover_to, b.failover_from);
    }

    #[tokio::test]
    async fn test_provider_preference_overrides_default_primary() {
        let fx = fixture(false, false, true);

        let resp = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new("hi").with_provider(ProviderName::Gemini))
            .await
            .unwrap();

        assert_eq!(resp.provider_used(), ProviderName::Gemini);
        assert!(!resp.failover);
        assert_eq!(fx.openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_failover_disabled_never_calls_alternate() {
        let fx = fixture(true, false, false);

        let err = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new("hi"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::PrimaryFailed {
                provider: ProviderName::OpenAi,
                ..
            }
        ));
        assert!(err.to_string().contains("openai"));
        assert_eq!(fx.openai.calls(), 1);
        assert_eq!(fx.gemini.calls(), 0);
    }

    #[tokio::test]
    async fn test_both_providers_fail() {
        let fx = fixture(true, true, true);

        let err = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new("hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::AllProvidersFailed { .. }));
        assert_eq!(err.to_string(), "Both providers failed");
        assert_eq!(fx.openai.calls(), 1);
        assert_eq!(fx.gemini.calls(), 1);

        let events = flushed_events(&fx).await;
        assert_eq!(events[0].action, AuditAction::FailoverFailed);
        let errors = events[0].errors.as_ref().unwrap();
        assert!(errors["primary"].as_str().unwrap().contains("503"));
        assert!(errors["alternate"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_simulating_alternate_does_not_affect_healthy_primary() {
        let fx = fixture(false, false, true);

        let resp = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new("hi").simulate_fail_on(ProviderName::Gemini))
            .await
            .unwrap();

        assert_eq!(resp.provider_used(), ProviderName::OpenAi);
        assert!(!resp.failover);
    }

    #[tokio::test]
    async fn test_simulated_alternate_after_real_primary_failure() {
        let fx = fixture(true, false, true);

        let err = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new("hi").simulate_fail_on(ProviderName::Gemini))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::AllProvidersFailed { .. }));
        assert_eq!(fx.gemini.calls(), 0);

        let events = flushed_events(&fx).await;
        let errors = events[0].errors.as_ref().unwrap();
        assert_eq!(errors["alternate"], "Simulated failure on gemini");
    }

    #[tokio::test]
    async fn test_blank_prompt_rejected_before_any_provider() {
        let fx = fixture(false, false, true);

        let err = fx
            .dispatcher
            .dispatch_chat(&ChatRequest::new(""))
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(fx.openai.calls() + fx.gemini.calls(), 0);
    }

    #[tokio::test]
    async fn test_extract_routes_to_extract_and_fails_over() {
        let fx = fixture(true, false, true);

        let resp = fx
            .dispatcher
            .dispatch_extract(&ExtractionRequest::new("Read it", "JVBERi0xLjQK"))
            .await
            .unwrap();

        assert!(resp.failover);
        assert_eq!(resp.text(), "gemini extracted application/pdf");
    }

    #[tokio::test]
    async fn test_extract_missing_payload_rejected() {
        let fx = fixture(false, false, true);

        let err = fx
            .dispatcher
            .dispatch_extract(&ExtractionRequest::new("Read it", ""))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "data_base64_required");
        assert_eq!(fx.openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_response() {
        let openai = MockAdapter::new(ProviderName::OpenAi, false);
        let gemini = MockAdapter::new(ProviderName::Gemini, false);
        let dispatcher = FailoverDispatcher::new(
            ProviderSet::new(openai, gemini),
            ProviderName::OpenAi,
            true,
            AuditLogger::new(Arc::new(FailingSink)),
        );

        let resp = dispatcher
            .dispatch_chat(&ChatRequest::new("hi").simulate_fail_on(ProviderName::OpenAi))
            .await
            .unwrap();

        assert!(resp.failover);
        assert_eq!(resp.provider_used(), ProviderName::Gemini);
        assert_eq!(dispatcher.flush_audit().await, 0);
    }

    #[tokio::test]
    async fn test_flush_delivers_event_before_returning() {
        let fx = fixture(false, false, true);

        fx.dispatcher
            .dispatch_chat(&ChatRequest::new("hi"))
            .await
            .unwrap();

        assert_eq!(fx.dispatcher.flush_audit().await, 1);
        let events = fx.sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::ProviderSelection);
    }

    #[tokio::test]
    async fn test_missing_primary_key_fails_over_like_upstream_error() {
        let openai = Arc::new(OpenAiAdapter::new(reqwest::Client::new(), None));
        let gemini = MockAdapter::new(ProviderName::Gemini, false);
        let sink = Arc::new(MemorySink::default());
        let dispatcher = FailoverDispatcher::new(
            ProviderSet::new(openai, gemini.clone()),
            ProviderName::OpenAi,
            true,
            AuditLogger::new(sink.clone()),
        );

        let resp = dispatcher
            .dispatch_chat(&ChatRequest::new("hi"))
            .await
            .unwrap();

        assert!(resp.failover);
        assert_eq!(resp.provider_used(), ProviderName::Gemini);
        assert_eq!(gemini.calls(), 1);

        dispatcher.flush_audit().await;
        let events = sink.events.lock().unwrap();
        let errors = events[0].errors.as_ref().unwrap();
        assert_eq!(errors["primary"], "openai API key is not configured");
    }
}

pub mod audit;
pub mod config;
pub mod error;
pub mod llm;

use anyhow::Result;

pub use audit::{AuditAction, AuditEvent, AuditLogger, AuditSink};
pub use config::{GatewayConfig, Timeouts};
pub use error::{GatewayError, ProviderError};
pub use llm::{
    ChatRequest, ExtractionRequest, FailoverDispatcher, HealthProber, HealthReport, ProviderAdapter,
    ProviderName, ProviderResult, ProviderSet, StatusReport, UnifiedResponse,
};

/// Initialize structured JSON logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

/// Everything a front end needs to serve requests, built once from config
#[derive(Clone)]
pub struct Gateway {
    pub dispatcher: FailoverDispatcher,
    pub prober: HealthProber,
}

impl Gateway {
    pub fn new(dispatcher: FailoverDispatcher, prober: HealthProber) -> Self {
        Self { dispatcher, prober }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let client = llm::http_client()?;
        let providers = llm::build_providers(config, &client);
        let audit = AuditLogger::from_config(&config.audit, client);

        tracing::info!(
            primary = %config.routing.primary,
            failover_enabled = config.routing.failover_enabled,
            audit_sink = audit.sink_name(),
            "Gateway configured"
        );

        let prober = HealthProber::new(providers.clone(), config.routing.failover_enabled);
        let dispatcher = FailoverDispatcher::from_config(config, providers, audit);
        Ok(Self::new(dispatcher, prober))
    }

    /// Current effective routing decision for the configured primary
    pub async fn status(&self) -> StatusReport {
        self.prober.status(self.dispatcher.primary()).await
    }

    /// Drain pending audit writes; call before the runtime shuts down
    pub async fn flush(&self) -> usize {
        self.dispatcher.flush_audit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_without_keys_never_fails() {
        let config = GatewayConfig::default();
        let gateway = Gateway::from_config(&config).unwrap();

        let report = gateway.status().await;
        assert!(report.ok);
        assert_eq!(report.primary, ProviderName::OpenAi);
        // Unhealthy primary routes to the alternate
        assert_eq!(report.active, ProviderName::Gemini);
        for health in report.providers.values() {
            assert!(!health.healthy);
        }
    }
}

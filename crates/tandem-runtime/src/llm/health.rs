use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::provider::ProviderSet;
use super::types::{HealthReport, ProviderName};

/// Effective routing decision plus per-provider probe results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub ok: bool,
    pub primary: ProviderName,
    pub active: ProviderName,
    pub failover_enabled: bool,
    pub providers: BTreeMap<ProviderName, HealthReport>,
    pub checked_at: DateTime<Utc>,
}

/// Probes every provider off the request path. Advisory only: the
/// dispatcher always tries the primary live.
#[derive(Clone)]
pub struct HealthProber {
    providers: ProviderSet,
    failover_enabled: bool,
}

impl HealthProber {
    pub fn new(providers: ProviderSet, failover_enabled: bool) -> Self {
        Self {
            providers,
            failover_enabled,
        }
    }

    /// Ping both providers concurrently and pick the active one
    pub async fn status(&self, primary: ProviderName) -> StatusReport {
        let openai = self.providers.get(ProviderName::OpenAi);
        let gemini = self.providers.get(ProviderName::Gemini);
        let (openai_report, gemini_report) = tokio::join!(openai.ping(), gemini.ping());

        let mut providers = BTreeMap::new();
        providers.insert(ProviderName::OpenAi, openai_report);
        providers.insert(ProviderName::Gemini, gemini_report);

        let active = select_active(primary, &providers);
        debug!(primary = %primary, active = %active, "Provider status computed");

        StatusReport {
            ok: true,
            primary,
            active,
            failover_enabled: self.failover_enabled,
            providers,
            checked_at: Utc::now(),
        }
    }
}

/// Primary when healthy, otherwise the alternate regardless of its health
pub fn select_active(
    primary: ProviderName,
    reports: &BTreeMap<ProviderName, HealthReport>,
) -> ProviderName {
    match reports.get(&primary) {
        Some(report) if report.healthy => primary,
        _ => primary.alternate(),
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::types::{truncate_chars, ProviderName, MAX_REASON_CHARS};

/// Audit event kinds emitted by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Primary provider served the request
    ProviderSelection,
    /// Alternate provider served the request after the primary failed
    Failover,
    /// Both providers failed
    FailoverFailed,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::ProviderSelection => "provider_selection",
            AuditAction::Failover => "failover",
            AuditAction::FailoverFailed => "failover_failed",
        }
    }
}

/// One row of the external audit table.
///
/// Field names on the wire match the audit table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(rename = "accion")]
    pub action: AuditAction,
    #[serde(rename = "estado_anterior")]
    pub previous: Option<ProviderName>,
    #[serde(rename = "estado_nuevo")]
    pub next: Option<ProviderName>,
    #[serde(rename = "datos_validados")]
    pub data: Option<Map<String, Value>>,
    #[serde(rename = "errores")]
    pub errors: Option<Map<String, Value>>,
}

impl AuditEvent {
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            previous: None,
            next: None,
            data: None,
            errors: None,
        }
    }

    pub fn transition(mut self, previous: Option<ProviderName>, next: Option<ProviderName>) -> Self {
        self.previous = previous;
        self.next = next;
        self
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    /// Record an error message, truncated for storage
    pub fn with_error(mut self, key: &str, message: &str) -> Self {
        self.errors.get_or_insert_with(Map::new).insert(
            key.to_string(),
            Value::String(truncate_chars(message, MAX_REASON_CHARS)),
        );
        self
    }
}

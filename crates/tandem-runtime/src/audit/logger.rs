use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::warn;

use super::events::AuditEvent;
use super::sink::{AuditSink, FileAuditSink, HttpAuditSink, NoopAuditSink, TracingAuditSink};
use crate::config::{AuditConfig, AuditSinkKind};

const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fire-and-forget front end over an `AuditSink`.
///
/// `emit` never fails: sink errors, timeouts and panics stay inside the
/// spawned task and are only logged. In-flight writes are tracked so a
/// short-lived process can `flush` them before the runtime shuts down.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
    timeout: Duration,
    pending: Arc<Mutex<Vec<JoinHandle<bool>>>>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            timeout: DEFAULT_WRITE_TIMEOUT,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopAuditSink))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the sink selected in config
    pub fn from_config(config: &AuditConfig, client: Client) -> Self {
        let sink: Arc<dyn AuditSink> = match (config.sink, &config.url, &config.file_path) {
            (AuditSinkKind::Http, Some(url), _) => {
                Arc::new(HttpAuditSink::new(client, url, config.api_key.clone()))
            }
            (AuditSinkKind::File, _, Some(path)) => Arc::new(FileAuditSink::new(path)),
            (AuditSinkKind::None, _, _) => Arc::new(NoopAuditSink),
            _ => Arc::new(TracingAuditSink),
        };
        Self::new(sink)
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Spawn the write and return immediately
    pub fn emit(&self, event: AuditEvent) {
        let sink = self.sink.clone();
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            match tokio::time::timeout(timeout, sink.write(&event)).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    warn!(
                        sink = sink.name(),
                        action = event.action.as_str(),
                        error = %e,
                        "Audit write failed"
                    );
                    false
                }
                Err(_) => {
                    warn!(
                        sink = sink.name(),
                        action = event.action.as_str(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Audit write timed out"
                    );
                    false
                }
            }
        });

        match self.pending.lock() {
            Ok(mut pending) => {
                pending.retain(|h| !h.is_finished());
                pending.push(handle);
            }
            Err(_) => warn!("Audit task list poisoned, write will not be flushed"),
        }
    }

    /// Wait for every in-flight write. Returns how many were delivered.
    pub async fn flush(&self) -> usize {
        let handles: Vec<JoinHandle<bool>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return 0,
        };

        let mut delivered = 0;
        for handle in handles {
            match handle.await {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Audit task aborted"),
            }
        }
        delivered
    }
}

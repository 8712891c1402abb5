use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::events::AuditEvent;

/// Destination for audit events. Implementations may fail freely;
/// `AuditLogger` isolates every error from the request path.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Sink name for logging
    fn name(&self) -> &str;

    async fn write(&self, event: &AuditEvent) -> Result<()>;
}

/// Writes events as structured log lines (target `audit`)
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn write(&self, event: &AuditEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        tracing::info!(
            target: "audit",
            action = event.action.as_str(),
            previous = ?event.previous,
            next = ?event.next,
            event = %payload,
            "Audit event"
        );
        Ok(())
    }
}

/// Discards every event
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn write(&self, _event: &AuditEvent) -> Result<()> {
        Ok(())
    }
}

/// Inserts events as rows through a REST table endpoint (PostgREST style)
pub struct HttpAuditSink {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpAuditSink {
    pub fn new(client: Client, url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl AuditSink for HttpAuditSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn write(&self, event: &AuditEvent) -> Result<()> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Prefer", "return=minimal")
            .timeout(Duration::from_secs(5))
            .json(event);

        if let Some(ref key) = self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("audit insert failed: {}", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("audit insert rejected ({}): {}", status, body));
        }
        Ok(())
    }
}

/// Appends events to a JSON-lines file
pub struct FileAuditSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileAuditSink {
    /// `~` in the path is expanded to the home directory
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(shellexpand::tilde(path).to_string()),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, event: &AuditEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        // One writer at a time keeps lines whole
        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open audit file {:?}", self.path))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

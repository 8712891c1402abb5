//! Process configuration.
//!
//! Built once at startup from defaults, an optional TOML file and the
//! environment (in that order of precedence, environment last), then shared
//! read-only. API keys only come from the environment.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::llm::types::ProviderName;
use crate::llm::{gemini, openai};

/// Per-call timeouts for provider requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub chat: Duration,
    pub health: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            chat: Duration::from_secs(default_chat_timeout()),
            health: Duration::from_secs(default_health_timeout()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default = "ProviderSettings::openai")]
    pub openai: ProviderSettings,

    #[serde(default = "ProviderSettings::gemini")]
    pub gemini: ProviderSettings,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default = "default_primary")]
    pub primary: ProviderName,

    #[serde(default = "default_true")]
    pub failover_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// Environment only
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Empty means the adapter's default model
    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_chat_timeout")]
    pub chat_secs: u64,

    #[serde(default = "default_health_timeout")]
    pub health_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    #[default]
    Tracing,
    Http,
    File,
    None,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub sink: AuditSinkKind,

    /// REST endpoint of the audit table (http sink)
    #[serde(default)]
    pub url: Option<String>,

    /// Environment only
    #[serde(skip)]
    pub api_key: Option<String>,

    /// JSON-lines file (file sink)
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Bearer token guarding the /llm-* routes; environment only
    #[serde(skip)]
    pub api_token: Option<String>,
}

fn default_primary() -> ProviderName {
    ProviderName::OpenAi
}

fn default_true() -> bool {
    true
}

fn default_chat_timeout() -> u64 {
    30
}

fn default_health_timeout() -> u64 {
    15
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            failover_enabled: default_true(),
        }
    }
}

impl ProviderSettings {
    fn openai() -> Self {
        Self {
            api_key: None,
            model: openai::DEFAULT_MODEL.to_string(),
            base_url: None,
        }
    }

    fn gemini() -> Self {
        Self {
            api_key: None,
            model: gemini::DEFAULT_MODEL.to_string(),
            base_url: None,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            chat_secs: default_chat_timeout(),
            health_secs: default_health_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
            api_token: None,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            openai: ProviderSettings::openai(),
            gemini: ProviderSettings::gemini(),
            timeouts: TimeoutConfig::default(),
            audit: AuditConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from optional TOML file, then apply process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        // Validated after the environment overlay, which may supply sink settings
        toml::from_str(&content).context("Failed to parse TOML config")
    }

    /// Overlay environment variables; `lookup` abstracts `std::env::var` for tests
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        self.openai.api_key = get("OPENAI_API_KEY").or(self.openai.api_key);
        self.gemini.api_key = get("GEMINI_API_KEY")
            .or_else(|| get("GOOGLE_API_KEY"))
            .or(self.gemini.api_key);

        if let Some(model) = get("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.openai.base_url = Some(url);
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            self.gemini.base_url = Some(url);
        }

        if let Some(primary) = get("LLM_PRIMARY_PROVIDER") {
            self.routing.primary = primary
                .parse::<ProviderName>()
                .context("Invalid LLM_PRIMARY_PROVIDER")?;
        }
        if let Some(flag) = get("LLM_FAILOVER_ENABLED") {
            self.routing.failover_enabled =
                parse_bool(&flag).context("Invalid LLM_FAILOVER_ENABLED")?;
        }
        if let Some(secs) = get("LLM_CHAT_TIMEOUT_SECS") {
            self.timeouts.chat_secs = secs.trim().parse().context("Invalid LLM_CHAT_TIMEOUT_SECS")?;
        }
        if let Some(secs) = get("LLM_HEALTH_TIMEOUT_SECS") {
            self.timeouts.health_secs =
                secs.trim().parse().context("Invalid LLM_HEALTH_TIMEOUT_SECS")?;
        }

        if let Some(url) = get("AUDIT_LOG_URL") {
            self.audit.url = Some(url);
            if self.audit.sink == AuditSinkKind::Tracing {
                self.audit.sink = AuditSinkKind::Http;
            }
        }
        if let Some(path) = get("AUDIT_LOG_FILE") {
            self.audit.file_path = Some(path);
            if self.audit.sink == AuditSinkKind::Tracing {
                self.audit.sink = AuditSinkKind::File;
            }
        }
        self.audit.api_key = get("AUDIT_LOG_API_KEY").or(self.audit.api_key);
        self.server.api_token = get("GATEWAY_API_TOKEN").or(self.server.api_token);

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.timeouts.chat_secs == 0 || self.timeouts.health_secs == 0 {
            return Err(anyhow!("Timeouts must be greater than zero"));
        }
        match self.audit.sink {
            AuditSinkKind::Http if self.audit.url.is_none() => {
                Err(anyhow!("audit.sink = \"http\" requires audit.url or AUDIT_LOG_URL"))
            }
            AuditSinkKind::File if self.audit.file_path.is_none() => Err(anyhow!(
                "audit.sink = \"file\" requires audit.file_path or AUDIT_LOG_FILE"
            )),
            _ => Ok(()),
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            chat: Duration::from_secs(self.timeouts.chat_secs),
            health: Duration::from_secs(self.timeouts.health_secs),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{}'", other)),
    }
}

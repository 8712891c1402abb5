//! Error types for provider calls and request dispatch.
//!
//! `ProviderError` describes why a single vendor call failed; the dispatcher
//! catches it and decides whether to fail over. `GatewayError` is what
//! leaves the dispatcher and is mapped to an HTTP status by the gateway.

use thiserror::Error;

use crate::llm::types::ProviderName;

/// Failure of a single provider call
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credential absent; raised before any network call
    #[error("{provider} API key is not configured")]
    MissingApiKey { provider: ProviderName },

    #[error("{provider} request timed out after {secs}s")]
    Timeout { provider: ProviderName, secs: u64 },

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: ProviderName,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: ProviderName,
        message: String,
    },

    #[error("{provider} returned an unreadable response: {message}")]
    InvalidResponse {
        provider: ProviderName,
        message: String,
    },

    /// Fault injected through `simulateFailOn`; no network call was made
    #[error("Simulated failure on {0}")]
    Simulated(ProviderName),
}

impl ProviderError {
    /// Coarse category used in logs: config, simulated or upstream
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::MissingApiKey { .. } => "config",
            ProviderError::Simulated(_) => "simulated",
            _ => "upstream",
        }
    }

    /// Drops the request URL, which can hold the Gemini key
    pub(crate) fn from_reqwest(provider: ProviderName, secs: u64, err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            ProviderError::Timeout { provider, secs }
        } else if err.is_decode() {
            ProviderError::InvalidResponse {
                provider,
                message: err.to_string(),
            }
        } else {
            ProviderError::Transport {
                provider,
                message: err.to_string(),
            }
        }
    }
}

/// Request-level failure surfaced by the dispatcher
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or missing client input; never retried or failed over
    #[error("{message}")]
    InvalidInput { code: &'static str, message: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Primary failed and failover is disabled
    #[error("Provider {provider} failed and failover is disabled")]
    PrimaryFailed {
        provider: ProviderName,
        #[source]
        source: ProviderError,
    },

    /// Primary and alternate both failed; details go to the audit log only
    #[error("Both providers failed")]
    AllProvidersFailed {
        primary: ProviderName,
        alternate: ProviderName,
    },
}

impl GatewayError {
    pub fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        GatewayError::InvalidInput {
            code,
            message: message.into(),
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidInput { code, .. } => code,
            GatewayError::UnknownProvider(_) => "unknown_provider",
            GatewayError::PrimaryFailed { .. } => "primary_failed",
            GatewayError::AllProvidersFailed { .. } => "all_providers_failed",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidInput { .. } | GatewayError::UnknownProvider(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_kinds() {
        let missing = ProviderError::MissingApiKey {
            provider: ProviderName::OpenAi,
        };
        assert_eq!(missing.kind(), "config");
        assert_eq!(missing.to_string(), "openai API key is not configured");

        let simulated = ProviderError::Simulated(ProviderName::Gemini);
        assert_eq!(simulated.kind(), "simulated");
        assert_eq!(simulated.to_string(), "Simulated failure on gemini");

        let api = ProviderError::Api {
            provider: ProviderName::Gemini,
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(api.kind(), "upstream");
    }

    #[test]
    fn test_gateway_error_messages_do_not_leak_upstream_detail() {
        let err = GatewayError::AllProvidersFailed {
            primary: ProviderName::OpenAi,
            alternate: ProviderName::Gemini,
        };
        assert_eq!(err.to_string(), "Both providers failed");
        assert_eq!(err.code(), "all_providers_failed");
        assert!(!err.is_client_error());

        let err = GatewayError::PrimaryFailed {
            provider: ProviderName::Gemini,
            source: ProviderError::Api {
                provider: ProviderName::Gemini,
                status: 500,
                body: "secret internals".into(),
            },
        };
        assert!(err.to_string().contains("gemini"));
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_unknown_provider_is_client_error() {
        let err = "mistral".parse::<ProviderName>().unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.code(), "unknown_provider");
    }
}

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::ApiError;

/// Bearer token authentication state
#[derive(Clone)]
pub struct AuthConfig {
    pub api_token: Option<String>,
}

impl AuthConfig {
    pub fn new(api_token: Option<String>) -> Self {
        Self { api_token }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_token.is_some()
    }

    fn accepts(&self, header: Option<&str>) -> bool {
        match (header.and_then(|h| h.strip_prefix("Bearer ")), &self.api_token) {
            (Some(token), Some(expected)) => token.as_bytes().ct_eq(expected.as_bytes()).into(),
            _ => false,
        }
    }
}

/// Authentication middleware for the /llm-* endpoints
pub async fn auth_middleware(
    auth_config: Arc<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    // Liveness stays open for load balancers
    if request.uri().path() == "/health" || !auth_config.is_enabled() {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    if auth_config.accepts(auth_header) {
        return next.run(request).await;
    }

    ApiError::Unauthorized.into_response()
}

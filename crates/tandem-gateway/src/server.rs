use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use tandem_runtime::{Gateway, StatusReport, UnifiedResponse};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{auth_middleware, AuthConfig};
use crate::error::ApiError;
use crate::types::*;

/// Base64 documents are large; cap request bodies at 25 MiB
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub auth_config: Arc<AuthConfig>,
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            auth_config: Arc::new(AuthConfig::new(None)),
            allowed_origins: vec![],
        }
    }

    pub fn with_auth(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = Arc::new(auth_config);
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

/// Create the Axum router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = if state.allowed_origins.is_empty() {
        // Permissive for development
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let auth_config = state.auth_config.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/llm-chat", post(llm_chat).fallback(method_not_allowed))
        .route("/llm-extract", post(llm_extract).fallback(method_not_allowed))
        .route("/llm-status", get(llm_status).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(move |req, next| {
            auth_middleware(auth_config.clone(), req, next)
        }))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the gateway server
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let gateway = state.gateway.clone();
    let router = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!(addr = %addr, "Starting gateway server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let delivered = gateway.flush().await;
    info!(audit_events_flushed = delivered, "Gateway server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections...");
}

// --- Handlers ---

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn llm_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<UnifiedResponse>, ApiError> {
    let Json(body) = payload?;
    let request = body.into_request()?;
    let response = state.gateway.dispatcher.dispatch_chat(&request).await?;
    Ok(Json(response))
}

async fn llm_extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractBody>, JsonRejection>,
) -> Result<Json<UnifiedResponse>, ApiError> {
    let Json(body) = payload?;
    let request = body.into_request()?;
    let response = state.gateway.dispatcher.dispatch_extract(&request).await?;
    Ok(Json(response))
}

/// Never fails: probe errors degrade to `healthy: false`
async fn llm_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.gateway.status().await)
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

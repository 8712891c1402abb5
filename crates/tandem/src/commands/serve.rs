use anyhow::Result;
use tandem_gateway::{start_server, AppState, AuthConfig};
use tandem_runtime::{Gateway, GatewayConfig};
use tracing::{info, warn};

pub async fn execute(host: Option<String>, port: Option<u16>, config: &GatewayConfig) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let gateway = Gateway::from_config(config)?;
    let auth = AuthConfig::new(config.server.api_token.clone());
    if auth.is_enabled() {
        info!("Bearer authentication enabled for /llm-* routes");
    } else {
        warn!("GATEWAY_API_TOKEN not set, /llm-* routes are unauthenticated");
    }

    let state = AppState::new(gateway)
        .with_auth(auth)
        .with_allowed_origins(config.server.allowed_origins.clone());

    start_server(state, &host, port).await
}

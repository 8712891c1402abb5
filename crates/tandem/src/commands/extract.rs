use anyhow::{Context, Result};
use base64::Engine;
use std::path::PathBuf;
use tandem_runtime::{ExtractionRequest, Gateway, GatewayConfig};

use super::{parse_provider, print_json};

pub async fn execute(
    prompt: String,
    file: PathBuf,
    mime_type: String,
    simulate_fail_on: Option<String>,
    config: &GatewayConfig,
) -> Result<()> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read document: {:?}", file))?;
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);

    let mut request = ExtractionRequest::new(prompt, data).with_mime_type(mime_type);
    if let Some(provider) = parse_provider(simulate_fail_on)? {
        request = request.simulate_fail_on(provider);
    }

    let gateway = Gateway::from_config(config)?;
    let outcome = gateway.dispatcher.dispatch_extract(&request).await;
    gateway.flush().await;
    print_json(&outcome?)
}

use anyhow::Result;
use tandem_runtime::{ChatRequest, Gateway, GatewayConfig};

use super::{parse_provider, print_json};

pub async fn execute(
    prompt: String,
    provider: Option<String>,
    simulate_fail_on: Option<String>,
    config: &GatewayConfig,
) -> Result<()> {
    let mut request = ChatRequest::new(prompt);
    if let Some(provider) = parse_provider(provider)? {
        request = request.with_provider(provider);
    }
    if let Some(provider) = parse_provider(simulate_fail_on)? {
        request = request.simulate_fail_on(provider);
    }

    let gateway = Gateway::from_config(config)?;
    let outcome = gateway.dispatcher.dispatch_chat(&request).await;
    gateway.flush().await;
    print_json(&outcome?)
}

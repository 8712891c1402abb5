use anyhow::Result;
use tandem_runtime::{Gateway, GatewayConfig};

use super::print_json;

pub async fn execute(config: &GatewayConfig) -> Result<()> {
    let gateway = Gateway::from_config(config)?;
    let report = gateway.status().await;
    print_json(&report)
}

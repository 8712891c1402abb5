pub mod chat;
pub mod extract;
pub mod init;
pub mod serve;
pub mod status;

use anyhow::Result;
use serde::Serialize;
use tandem_runtime::ProviderName;

/// Parse an optional provider flag, rejecting unknown names
pub(crate) fn parse_provider(value: Option<String>) -> Result<Option<ProviderName>> {
    Ok(value.map(|v| v.parse::<ProviderName>()).transpose()?)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tandem_runtime::GatewayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tandem_runtime::init_logging();

    let cli = Cli::parse();

    // Init writes the config, so it must not need one
    if let Commands::Init { path } = &cli.command {
        return commands::init::run_init(path);
    }

    let config = GatewayConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),
        Commands::Serve { host, port } => {
            commands::serve::execute(host, port, &config).await?;
        }
        Commands::Status => {
            commands::status::execute(&config).await?;
        }
        Commands::Chat {
            prompt,
            provider,
            simulate_fail_on,
        } => {
            commands::chat::execute(prompt, provider, simulate_fail_on, &config).await?;
        }
        Commands::Extract {
            prompt,
            file,
            mime_type,
            simulate_fail_on,
        } => {
            commands::extract::execute(prompt, file, mime_type, simulate_fail_on, &config).await?;
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Tandem - two-provider LLM gateway with failover", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new config file
    Init {
        /// Path for new config file
        #[arg(default_value = "tandem.toml")]
        path: PathBuf,
    },
    /// Start the HTTP gateway server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Probe both providers and print the effective routing decision
    Status,
    /// Send one chat prompt through the failover dispatcher
    Chat {
        /// Prompt text
        #[arg(long)]
        prompt: String,
        /// Provider to try first instead of the configured primary
        #[arg(long)]
        provider: Option<String>,
        /// Force a failure on this provider without calling it
        #[arg(long)]
        simulate_fail_on: Option<String>,
    },
    /// Extract information from a local document
    Extract {
        /// Extraction instructions
        #[arg(long)]
        prompt: String,
        /// Document to send
        #[arg(long)]
        file: PathBuf,
        /// MIME type of the document
        #[arg(long, default_value = "application/pdf")]
        mime_type: String,
        /// Force a failure on this provider without calling it
        #[arg(long)]
        simulate_fail_on: Option<String>,
    },
}

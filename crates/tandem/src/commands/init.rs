use anyhow::Result;
use std::path::Path;

// API keys are read from OPENAI_API_KEY / GEMINI_API_KEY, never from this file
const DEFAULT_CONFIG: &str = r#"# Tandem gateway configuration

[routing]
primary = "openai"
failover_enabled = true

[openai]
model = "gpt-4o-mini"

[gemini]
model = "gemini-2.0-flash"

[timeouts]
chat_secs = 30
health_secs = 15

[audit]
# tracing | http | file | none
sink = "tracing"

[server]
host = "127.0.0.1"
port = 8080
allowed_origins = []
"#;

/// Initialize a new config file
pub fn run_init(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config already exists at {:?}", path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    println!("Created config at {:?}", path);
    Ok(())
}

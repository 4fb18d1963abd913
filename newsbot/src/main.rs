/*
newsbot - single-binary main.rs
This binary loads the conversation history and serves the chat UI over Rocket.
*/

use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsbot::llm::remote::{read_api_key, RemoteLlmProvider};
use newsbot::llm::LlmProvider;
use newsbot::server::{launch_rocket, AppState};
use newsbot::sessions::ChatSession;

#[derive(Parser, Debug)]
#[command(name = "newsbot", about = "Web chat with news search and summaries")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Secrets may live in a .env file next to the binary
    if let Ok(path) = dotenv::dotenv() {
        info!(path = ?path, ".env loaded");
    }

    let config = load_config(args.config).await?;

    let api_key = match read_api_key(&config.llm.api_key_env) {
        Some(key) => key,
        None => {
            error!(env = %config.llm.api_key_env, "API key missing, refusing to start");
            eprintln!(
                "{} 환경 변수가 설정되지 않았습니다. ({} is not set)",
                config.llm.api_key_env, config.llm.api_key_env
            );
            anyhow::bail!("missing API key in {}", config.llm.api_key_env);
        }
    };

    let provider = RemoteLlmProvider::from_config(&config.llm, api_key);
    info!(model = provider.model(), url = %config.llm.api_url, "LLM provider initialized");
    let provider: Arc<dyn LlmProvider> = Arc::new(provider);

    let session = ChatSession::from_config(&config, provider).await?;

    if let Err(e) = launch_rocket(AppState::new(session), &config.server).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// `config.default.toml` merged with `--config FILE` (or `./config.toml` when present).
async fn load_config(cli_path: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = cli_path {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

//! Trench Trainer Server
//!
//! Authoritative server binary. Loads the content dataset, binds the
//! WebSocket listener, and runs until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use trench_trainer::{ContentSet, GameServer, RoundGenerator, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Trench Trainer Server v{VERSION}");

    // Content: external dataset if configured, compiled-in set otherwise.
    let content = match std::env::var("TRENCH_CONTENT_PATH") {
        Ok(path) => {
            info!("loading content from {path}");
            ContentSet::load(&path).with_context(|| format!("loading content from {path}"))?
        }
        Err(_) => {
            info!("using built-in content set");
            ContentSet::builtin()
        }
    };
    info!(
        themes = content.themes.len(),
        fillers = content.fillers.len(),
        "content validated"
    );
    let generator = Arc::new(RoundGenerator::new(content).context("content rejected")?);

    let mut config = ServerConfig::default();
    if let Ok(addr) = std::env::var("TRENCH_BIND_ADDR") {
        config.bind_addr = addr
            .parse()
            .with_context(|| format!("invalid TRENCH_BIND_ADDR: {addr}"))?;
    }
    if let Ok(max) = std::env::var("TRENCH_MAX_CONNECTIONS") {
        config.max_connections = max
            .parse()
            .with_context(|| format!("invalid TRENCH_MAX_CONNECTIONS: {max}"))?;
    }

    let server = Arc::new(GameServer::new(config, generator));

    // Ctrl-C flips the shutdown broadcast; run() drains and returns.
    let signal_server = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_server.shutdown();
        }
    });

    server.run().await.context("server failed")?;
    info!("server stopped");
    Ok(())
}

//! chat-widget-engine: background daemon hosting chat widgets
//!
//! A front end connects over a Unix domain socket, forwards transport
//! signals, user input and page callbacks, and subscribes to outbound
//! events and platform commands.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_widget_engine::config::Config;
use chat_widget_engine::ipc::Server;
use chat_widget_engine::lifecycle::ShutdownSignal;

/// Resolution of the recording clock
const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "chat-widget-engine starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, audio_input = ?config.widget.audio_input, "configuration loaded");

    let mut shutdown = ShutdownSignal::new()?;
    let server = Server::new(&config.socket_path, config.widget.clone())?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Drive raw recording durations
        _ = async {
            let mut ticks = tokio::time::interval(TICK_INTERVAL);
            loop {
                ticks.tick().await;
                server.tick(Instant::now()).await;
            }
        } => {}

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    server.detach_all().await;
    server.shutdown().await;

    info!("chat-widget-engine stopped");

    Ok(())
}

mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use platano_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use platano_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.registry.clone(),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bot_name = bootstrap::BOT_NAME,
        "platano-server started"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let gateway = app.gateway_runner;
    let mut gateway_task = tokio::spawn(async move { gateway.start().await });

    tokio::select! {
        outcome = &mut gateway_task => {
            tracing::info!(
                event_name = "system.server.gateway_finished",
                correlation_id = "bootstrap",
                outcome = ?outcome.ok(),
                "gateway runner finished; serving health until shutdown"
            );
            wait_for_shutdown().await?;
        }
        signal = wait_for_shutdown() => {
            signal?;
            if tokio::time::timeout(grace, &mut gateway_task).await.is_err() {
                gateway_task.abort();
            }
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "platano-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

mod api;
mod bootstrap;
mod drafts;
mod health;
mod intake;
mod routes;

use std::time::Duration;

use anyhow::Result;
use devteam_core::config::{AppConfig, LoadOptions};
use tokio::sync::oneshot;
use tracing::{info, warn};

fn init_logging(config: &AppConfig) {
    use devteam_core::config::LogFormat::*;
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
    // Logging needs the loaded config, so it is initialized before bootstrap.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, routes::build(&app)).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut serving = tokio::spawn(async move { server.await });

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "devteam-server listening"
    );

    tokio::select! {
        joined = &mut serving => {
            joined??;
            app.db_pool.close().await;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => signal?,
    }

    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "devteam-server stopping"
    );
    let _ = stop_tx.send(());

    match tokio::time::timeout(grace, &mut serving).await {
        Ok(joined) => joined??,
        Err(_) => {
            warn!(
                event_name = "system.server.shutdown_timeout",
                correlation_id = "shutdown",
                "in-flight requests did not finish within the grace period"
            );
            serving.abort();
        }
    }

    app.db_pool.close().await;
    Ok(())
}

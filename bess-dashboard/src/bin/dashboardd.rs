//! BESS dashboard daemon.
//!
//! Serves the dashboard API on `BESS_LISTEN`, proxying the device API when
//! configured and synthesizing telemetry otherwise.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use bess_dashboard::api::{self, SharedState};
use bess_dashboard::config::ServerConfig;
use bess_dashboard::resolver::TelemetryResolver;
use bess_dashboard::site::{SiteConfigProvider, SiteTable};
use bess_dashboard::tracing::{self, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init_journald_or_stdout();

    let sites = Arc::new(SiteTable::builtin());
    let config = ServerConfig::from_env(&sites.keys())?;
    info!(sites = ?sites.keys(), "Starting bess-dashboardd");

    let resolver = TelemetryResolver::new(sites, &config.upstream)?;
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    api::serve(listener, SharedState::new(resolver), shutdown).await?;
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                return;
            }
        }
        _ = terminate => {}
    }

    info!("Shutdown requested");
    shutdown.cancel();
}

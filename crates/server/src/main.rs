use std::{future::IntoFuture, time::Duration};

use anyhow::{self, Error as AnyhowError};
use db::DbErr;
use deployment::{Deployment, DeploymentError};
use server::{DeploymentImpl, http};
use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, prelude::*};

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CorePmError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

fn init_tracing() -> Result<(), AnyhowError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},deployment={level},local_deployment={level},client={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string)
        .map_err(|err| anyhow::anyhow!("Failed to create tracing filter: {err}"))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), CorePmError> {
    init_tracing()?;

    let deployment = DeploymentImpl::new().await?;
    let app_router = http::router(deployment.clone());

    let settings = deployment.settings();
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", settings.host, settings.port)).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(
        "{} running on http://{local_addr}{}",
        settings.app_name,
        http::API_PREFIX
    );

    let (drain_rx, force_rx) = spawn_signal_listener();

    let server = axum::serve(
        listener,
        app_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_flag(drain_rx.clone()))
    .into_future();
    tokio::pin!(server);

    let serve_result = tokio::select! {
        res = &mut server => res,
        _ = wait_for_flag(force_rx) => {
            tracing::warn!("Force shutdown requested (second signal), exiting immediately");
            std::process::exit(130);
        }
        _ = drain_deadline(drain_rx, GRACEFUL_SHUTDOWN_TIMEOUT) => {
            tracing::warn!(
                "Graceful shutdown timed out after {:?}, exiting immediately",
                GRACEFUL_SHUTDOWN_TIMEOUT
            );
            std::process::exit(130);
        }
    };

    serve_result?;
    tracing::info!("Server stopped");
    Ok(())
}

/// First signal starts a graceful drain, the second forces an exit.
fn spawn_signal_listener() -> (watch::Receiver<bool>, watch::Receiver<bool>) {
    let (drain_tx, drain_rx) = watch::channel(false);
    let (force_tx, force_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(err) = termination_signal().await {
            tracing::error!(error = %err, "Failed to install signal handlers");
            return;
        }
        tracing::info!("Shutdown signal received, draining requests (press Ctrl+C again to force)");
        let _ = drain_tx.send(true);

        if let Err(err) = termination_signal().await {
            tracing::error!(error = %err, "Failed to install signal handlers");
            return;
        }
        tracing::warn!("Second shutdown signal received, forcing exit");
        let _ = force_tx.send(true);
    });

    (drain_rx, force_rx)
}

#[cfg(unix)]
async fn termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

async fn wait_for_flag(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn drain_deadline(rx: watch::Receiver<bool>, timeout: Duration) {
    wait_for_flag(rx).await;
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::watch;

    use super::{drain_deadline, wait_for_flag};

    #[tokio::test]
    async fn flag_wait_resolves_once_set() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_flag(rx));
        assert!(!waiter.is_finished());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn deadline_starts_only_after_drain_begins() {
        let (tx, rx) = watch::channel(false);
        let deadline = tokio::spawn(drain_deadline(rx, Duration::from_millis(20)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!deadline.is_finished());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), deadline)
            .await
            .unwrap()
            .unwrap();
    }
}

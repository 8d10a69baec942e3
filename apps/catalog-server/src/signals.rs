use anyhow::{Context, Result};

/// Resolves with the name of the first termination signal received.
///
/// # Errors
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown() -> Result<&'static str> {
    let name = tokio::select! {
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("listening for SIGINT")?;
            "SIGINT"
        }
        terminated = terminate() => terminated?,
    };
    tracing::info!(signal = name, "Stopping catalog server, draining in-flight requests");
    Ok(name)
}

#[cfg(unix)]
async fn terminate() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    signal(SignalKind::terminate())
        .context("installing SIGTERM handler")?
        .recv()
        .await;
    Ok("SIGTERM")
}

#[cfg(not(unix))]
async fn terminate() -> Result<&'static str> {
    std::future::pending().await
}

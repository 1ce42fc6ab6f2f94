use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is received.
/// The scheduler and trigger sources watch this token and stop once it fires.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            received = sigterm.recv() => match received {
                Some(()) => info!("Received SIGTERM, initiating graceful shutdown"),
                None => error!("SIGTERM stream closed, shutting down"),
            },
            received = sigint.recv() => match received {
                Some(()) => info!("Received SIGINT, initiating graceful shutdown"),
                None => error!("SIGINT stream closed, shutting down"),
            },
        }

        token_clone.cancel();
    });

    Ok(token)
}

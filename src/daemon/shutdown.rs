use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Detects signals sent to the process. This works with limmited success.
///
/// On Windows detached processes can't detect signals sent to them, so this should be enhanced in
/// the future to support another way of sending signals.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt");
        },
        _ = terminate() => {
            info!("Received terminate");
        },
        _ = cancelation.cancelled() => {
            return;
        }
    };
    cancelation.cancel();
}

/// `dayreview stop` sends SIGTERM, so it has to trigger the same flush as Ctrl+C.
#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!("Failed to listen for SIGTERM {e:?}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}

//! Ctrl-C / SIGTERM raise the round's cancellation token.

use mgc_core::control::CancelToken;
use tokio::task::JoinHandle;

/// Cancel `cancel` on the first interrupt. Abort the handle once the command is done.
pub fn spawn_cancel_on_signal(cancel: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if wait_for_signal().await {
            cancel.cancel();
        }
    })
}

/// Resolves true when an interrupt arrived, false if no handler could be installed.
async fn wait_for_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => res.is_ok(),
                    _ = term.recv() => true,
                }
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {}", e);
                tokio::signal::ctrl_c().await.is_ok()
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.is_ok()
    }
}

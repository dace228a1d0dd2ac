//! Cooperative cancellation for clone rounds.
//!
//! One `CancelToken` is shared by the submitter, every worker and the progress
//! view. Raising it never interrupts a running clone; it only stops new jobs
//! from being submitted or claimed.

use std::sync::Arc;
use tokio::sync::watch;

/// Returned when a round stopped because cancellation was requested.
#[derive(Debug)]
pub struct RoundCancelled;

impl std::fmt::Display for RoundCancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "round cancelled by user")
    }
}

impl std::error::Error for RoundCancelled {}

/// Shared, idempotent cancellation signal. Cloning yields another handle to the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal. Calling it again has no further effect.
    pub fn cancel(&self) {
        let was_cancelled = self.tx.send_replace(true);
        if !was_cancelled {
            tracing::info!("cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal has been raised (immediately if it already was).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so `wait_for` cannot observe a closed channel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_idempotent_and_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        other.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_raised() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already cancelled");
    }
}

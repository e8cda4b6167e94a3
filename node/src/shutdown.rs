//! Shutdown signalling for the ingestor and the HTTP front end.
//!
//! A `tokio::sync::broadcast` channel wakes every running task; a sticky
//! flag lets code that looks later (a second `stop`) see that shutdown
//! already happened.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio::sync::broadcast;

/// Tasks take a receiver from [`subscribe`](Self::subscribe) before they are
/// spawned and `select!` on it next to their own work.
pub struct ShutdownController {
    notify: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            triggered: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    /// Wake every subscriber. Later calls are no-ops.
    pub fn shutdown(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            let _ = self.notify.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve on Ctrl-C (or SIGTERM on unix), then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let which = tokio::select! {
            _ = signal::ctrl_c() => "SIGINT",
            _ = terminate => "SIGTERM",
        };
        tracing::info!(signal = which, "stopping tip selection");
        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_is_woken() {
        let controller = ShutdownController::new();
        let mut ingest = controller.subscribe();
        let mut http = controller.subscribe();
        assert!(!controller.is_triggered());
        controller.shutdown();
        assert!(ingest.recv().await.is_ok());
        assert!(http.recv().await.is_ok());
        assert!(controller.is_triggered());
    }

    #[tokio::test]
    async fn repeated_shutdown_sends_once() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        controller.shutdown();
        controller.shutdown();
        assert!(rx.recv().await.is_ok());
        assert!(rx.try_recv().is_err());
    }
}

//! Graceful shutdown coordination
//!
//! One watch channel fans the stop signal out to the HTTP server and the
//! span writer. The writer is the only task with real work to finish: it
//! drains the buffer under its own deadline, so the join timeout here is
//! sized just above that drain window.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::constants::SHUTDOWN_TIMEOUT_SECS;

#[derive(Clone)]
pub struct ShutdownService {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ShutdownService {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Track a spawned task so `shutdown` can wait for it to finish.
    pub async fn register(&self, handle: JoinHandle<()>) {
        self.handles.lock().await.push(handle);
    }

    /// A receiver that flips to true once shutdown begins.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Raise the stop signal without waiting for anything.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Raise the stop signal, then block until every tracked task exits.
    /// The writer drains the span buffer inside its own bounded window;
    /// the join timeout sits above that window, so hitting it means a task
    /// is wedged and gets abandoned rather than stalling process exit.
    pub async fn shutdown(&self) {
        self.trigger();

        let tasks = std::mem::take(&mut *self.handles.lock().await);
        tracing::debug!(tasks = tasks.len(), "Stop signal raised, letting the writer drain");

        let join_window = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        match tokio::time::timeout(join_window, futures::future::join_all(tasks)).await {
            Ok(_) => tracing::debug!("All tracked tasks exited"),
            Err(_) => tracing::warn!(
                join_window_secs = join_window.as_secs(),
                "Tracked tasks still running past the join window, abandoning them"
            ),
        }
    }

    /// Owned future resolving when shutdown begins; handed to axum's
    /// graceful-shutdown hook.
    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.rx.clone();
        async move {
            let _ = rx.wait_for(|&v| v).await;
        }
    }

    /// Spawn a task that raises the stop signal on the first Ctrl+C or
    /// SIGTERM.
    pub fn install_signal_handlers(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            let signal = wait_for_stop_signal().await;
            tracing::info!(signal, "Stop signal received, shutting down");
            service.trigger();
        });
    }
}

/// Resolve with the name of whichever stop signal arrives first.
async fn wait_for_stop_signal() -> &'static str {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Ctrl+C handler installation failed");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation failed")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "ctrl_c",
        _ = sigterm => "sigterm",
    }
}

impl Default for ShutdownService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_untriggered() {
        assert!(!ShutdownService::new().is_triggered());
    }

    #[tokio::test]
    async fn test_trigger_flips_state_and_subscribers() {
        let shutdown = ShutdownService::new();
        let rx = shutdown.subscribe();
        assert!(!*rx.borrow());

        shutdown.trigger();

        assert!(shutdown.is_triggered());
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_wait_resolves_once_triggered() {
        let shutdown = ShutdownService::new();
        let waiting = tokio::spawn(shutdown.wait());

        tokio::task::yield_now().await;
        shutdown.trigger();

        tokio::time::timeout(std::time::Duration::from_millis(100), waiting)
            .await
            .expect("wait() should resolve after trigger")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_joins_registered_task() {
        let shutdown = ShutdownService::new();
        let mut rx = shutdown.subscribe();

        shutdown
            .register(tokio::spawn(async move {
                let _ = rx.wait_for(|&v| v).await;
            }))
            .await;

        tokio::time::timeout(std::time::Duration::from_secs(1), shutdown.shutdown())
            .await
            .expect("shutdown should not hang on a signal-aware task");
    }
}

//! Background span writer (stage 2 of the write path)
//!
//! A single long-lived task owns the buffer-to-database path. Each
//! iteration waits briefly for buffered records, drains a batch, and issues
//! one multi-row insert. Transient database failures re-queue the batch and
//! back off; permanent failures drop the batch after one retry so a poison
//! batch cannot stall the writer. Nothing here ever propagates an error to
//! a request handler: reachability is observed through `WriterStatus`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::constants::{
    WRITER_DRAIN_DEADLINE_SECS, WRITER_POLL_INTERVAL_MS, WRITER_RESTART_MAX_BACKOFF_SECS,
};
use crate::data::SpanBuffer;
use crate::data::postgres::repositories::span::insert_spans;

/// Database reachability as observed by the writer. Read by the health
/// endpoint; written only by the writer task.
pub struct WriterStatus {
    db_connected: AtomicBool,
}

impl WriterStatus {
    /// Starts connected: pool initialization and migrations have already
    /// proven reachability by the time the writer exists.
    pub fn new() -> Self {
        Self {
            db_connected: AtomicBool::new(true),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.db_connected.load(Ordering::Relaxed)
    }

    fn set_connected(&self, connected: bool) {
        self.db_connected.store(connected, Ordering::Relaxed);
    }
}

impl Default for WriterStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// The writer task and its wiring.
pub struct SpanWriter {
    buffer: Arc<SpanBuffer>,
    pool: PgPool,
    status: Arc<WriterStatus>,
    batch_size: usize,
    retry_interval: Duration,
}

impl SpanWriter {
    pub fn new(
        buffer: Arc<SpanBuffer>,
        pool: PgPool,
        status: Arc<WriterStatus>,
        batch_size: usize,
        retry_interval: Duration,
    ) -> Self {
        Self {
            buffer,
            pool,
            status,
            batch_size,
            retry_interval,
        }
    }

    /// Spawn the writer task. Panics inside the loop are caught at the task
    /// boundary and trigger a restart with exponential backoff capped at
    /// `WRITER_RESTART_MAX_BACKOFF_SECS`.
    pub fn start(self, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut restarts: u32 = 0;

            loop {
                let mut rx = shutdown_rx.clone();
                let run = std::panic::AssertUnwindSafe(self.run(&mut rx))
                    .catch_unwind()
                    .await;

                match run {
                    Ok(()) => break,
                    Err(_) => {
                        self.status.set_connected(false);
                        let backoff_secs =
                            (1u64 << restarts.min(6)).min(WRITER_RESTART_MAX_BACKOFF_SECS);
                        restarts = restarts.saturating_add(1);
                        tracing::error!(
                            restarts,
                            backoff_secs,
                            "Span writer panicked, restarting after backoff"
                        );
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Span writer stopped");
        })
    }

    async fn run(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        tracing::debug!(
            batch_size = self.batch_size,
            retry_interval_secs = self.retry_interval.as_secs(),
            "Span writer started"
        );

        loop {
            // Wait for a wake signal or poll after a short interval; the
            // poll covers wakeups lost while a drain was in progress.
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        self.drain_on_shutdown().await;
                        return;
                    }
                    continue;
                }
                _ = self.buffer.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(WRITER_POLL_INTERVAL_MS)) => {}
            }

            // Drain until the buffer is empty or a transient failure asks
            // for a pause.
            loop {
                let batch = self.buffer.drain(self.batch_size);
                if batch.is_empty() {
                    break;
                }

                if !self.write_batch(batch).await {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                self.drain_on_shutdown().await;
                                return;
                            }
                        }
                        _ = tokio::time::sleep(self.retry_interval) => {}
                    }
                    break;
                }
            }
        }
    }

    /// Write one batch. Returns false when the batch hit a transient
    /// failure and was re-queued, signalling the caller to back off.
    async fn write_batch(&self, batch: Vec<crate::data::SpanRecord>) -> bool {
        let count = batch.len();
        match insert_spans(&self.pool, &batch).await {
            Ok(()) => {
                self.status.set_connected(true);
                tracing::debug!(spans = count, "Batch written");
                true
            }
            Err(e) if e.is_transient() => {
                self.status.set_connected(false);
                tracing::warn!(
                    error = %e,
                    spans = count,
                    "Transient database error, re-queueing batch"
                );
                self.buffer.requeue_front(batch);
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, spans = count, "Insert failed, retrying once");
                match insert_spans(&self.pool, &batch).await {
                    Ok(()) => {
                        self.status.set_connected(true);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            dropped = count,
                            "Dropping batch after permanent database error"
                        );
                        true
                    }
                }
            }
        }
    }

    /// Flush the buffer with a bounded deadline on graceful shutdown.
    /// Residual records past the deadline (or behind an unreachable
    /// database) are logged and discarded.
    async fn drain_on_shutdown(&self) {
        let deadline = Instant::now() + Duration::from_secs(WRITER_DRAIN_DEADLINE_SECS);
        tracing::debug!(
            buffered = self.buffer.len(),
            deadline_secs = WRITER_DRAIN_DEADLINE_SECS,
            "Span writer draining on shutdown"
        );

        loop {
            let batch = self.buffer.drain(self.batch_size);
            if batch.is_empty() {
                tracing::debug!("Span writer drained buffer on shutdown");
                return;
            }

            let count = batch.len();
            if Instant::now() >= deadline {
                let residual = count + self.buffer.len();
                tracing::warn!(residual, "Shutdown drain deadline reached, discarding records");
                return;
            }

            match insert_spans(&self.pool, &batch).await {
                Ok(()) => {}
                Err(e) if e.is_transient() => {
                    let residual = count + self.buffer.len();
                    tracing::warn!(
                        error = %e,
                        residual,
                        "Database unreachable during shutdown drain, discarding records"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, dropped = count, "Dropping batch during shutdown drain");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_status_starts_connected() {
        let status = WriterStatus::new();
        assert!(status.is_connected());
    }

    #[test]
    fn test_writer_status_flips() {
        let status = WriterStatus::new();
        status.set_connected(false);
        assert!(!status.is_connected());
        status.set_connected(true);
        assert!(status.is_connected());
    }
}

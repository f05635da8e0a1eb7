//! Bounded in-memory span buffer
//!
//! The only mutable state shared between the ingest handlers and the writer
//! task. Producers never block and never fail: when the buffer is full the
//! oldest record is discarded and counted, so under sustained overload the
//! retained window biases toward fresh data.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::data::types::SpanRecord;

/// Bounded FIFO of accepted span records awaiting persistence.
pub struct SpanBuffer {
    queue: Mutex<VecDeque<SpanRecord>>,
    capacity: usize,
    overflow: AtomicU64,
    notify: Notify,
}

impl SpanBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.clamp(1, 4096))),
            capacity: capacity.max(1),
            overflow: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Enqueue a batch of records in order, dropping the oldest buffered
    /// records on overflow. Returns the number dropped.
    pub fn push_batch(&self, records: Vec<SpanRecord>) -> u64 {
        if records.is_empty() {
            return 0;
        }

        let mut dropped: u64 = 0;
        {
            let mut queue = self.queue.lock();
            for record in records {
                if queue.len() >= self.capacity {
                    queue.pop_front();
                    dropped += 1;
                }
                queue.push_back(record);
            }
        }

        if dropped > 0 {
            self.overflow.fetch_add(dropped, Ordering::Relaxed);
            tracing::debug!(dropped, "Span buffer overflow, dropped oldest records");
        }
        self.notify.notify_one();
        dropped
    }

    /// Remove and return up to `max` records from the head, preserving order.
    pub fn drain(&self, max: usize) -> Vec<SpanRecord> {
        let mut queue = self.queue.lock();
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    /// Put a drained batch back at the head after a failed write, keeping it
    /// ahead of anything enqueued in the meantime. If the buffer refilled
    /// past capacity, the oldest records (the front of the batch) are
    /// dropped and counted as overflow.
    pub fn requeue_front(&self, batch: Vec<SpanRecord>) {
        if batch.is_empty() {
            return;
        }

        let dropped = {
            let mut queue = self.queue.lock();
            let excess = (queue.len() + batch.len()).saturating_sub(self.capacity);
            for record in batch.into_iter().skip(excess).rev() {
                queue.push_front(record);
            }
            excess as u64
        };

        if dropped > 0 {
            self.overflow.fetch_add(dropped, Ordering::Relaxed);
            tracing::debug!(dropped, "Span buffer overflow while re-queueing batch");
        }
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Current depth as a fraction of capacity, in [0.0, 1.0].
    pub fn usage(&self) -> f64 {
        self.len() as f64 / self.capacity as f64
    }

    /// Total records discarded due to overflow since startup.
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Resolve when a producer signals new data. A permit stored by a signal
    /// that raced this call resolves immediately; the writer pairs this with
    /// a timeout so missed wakeups only cost one poll interval.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

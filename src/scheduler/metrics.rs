//! Metrics for the batching scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for monitoring scheduler behaviour.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Total tickets accepted at intake
    pub tickets_received: AtomicU64,

    /// Tickets currently in the pending queue
    pub tickets_queued: AtomicU64,

    /// Tickets whose result was delivered
    pub tickets_completed: AtomicU64,

    /// Tickets that failed with a downstream error
    pub tickets_failed: AtomicU64,

    /// Batches dispatched downstream
    pub batches_dispatched: AtomicU64,

    /// Total tickets across all batches (for batch size averaging)
    pub total_batch_tickets: AtomicU64,

    /// Total queue wait time in milliseconds (for averaging)
    pub total_queue_wait_ms: AtomicU64,

    /// Maximum queue depth observed
    pub max_queue_depth: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ticket accepted at intake
    pub fn record_received(&self) {
        self.tickets_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a ticket entering the queue
    pub fn record_enqueued(&self) {
        let queued = self.tickets_queued.fetch_add(1, Ordering::Relaxed) + 1;
        let mut current_max = self.max_queue_depth.load(Ordering::Relaxed);
        while queued > current_max {
            match self.max_queue_depth.compare_exchange_weak(
                current_max,
                queued,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => current_max = x,
            }
        }
    }

    /// Record a ticket admitted to a batch
    pub fn record_dequeued(&self, wait_time: Duration) {
        self.tickets_queued.fetch_sub(1, Ordering::Relaxed);
        self.total_queue_wait_ms
            .fetch_add(wait_time.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record a batch being dispatched
    pub fn record_batch(&self, batch_size: usize) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.total_batch_tickets
            .fetch_add(batch_size as u64, Ordering::Relaxed);
    }

    /// Record a ticket whose result was delivered
    pub fn record_completed(&self) {
        self.tickets_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a ticket failed by a downstream error
    pub fn record_failed(&self) {
        self.tickets_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Current queue depth
    pub fn queue_depth(&self) -> u64 {
        self.tickets_queued.load(Ordering::Relaxed)
    }

    /// Average queue wait in milliseconds over dispatched tickets
    pub fn avg_queue_wait_ms(&self) -> f64 {
        let dispatched = self.total_batch_tickets.load(Ordering::Relaxed);
        if dispatched == 0 {
            return 0.0;
        }
        let total_wait = self.total_queue_wait_ms.load(Ordering::Relaxed);
        total_wait as f64 / dispatched as f64
    }

    /// Average batch size
    pub fn avg_batch_size(&self) -> f64 {
        let batches = self.batches_dispatched.load(Ordering::Relaxed);
        if batches == 0 {
            return 0.0;
        }
        let tickets = self.total_batch_tickets.load(Ordering::Relaxed);
        tickets as f64 / batches as f64
    }

    /// Snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tickets_received: self.tickets_received.load(Ordering::Relaxed),
            tickets_queued: self.tickets_queued.load(Ordering::Relaxed),
            tickets_completed: self.tickets_completed.load(Ordering::Relaxed),
            tickets_failed: self.tickets_failed.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            max_queue_depth: self.max_queue_depth.load(Ordering::Relaxed),
            avg_queue_wait_ms: self.avg_queue_wait_ms(),
            avg_batch_size: self.avg_batch_size(),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub tickets_received: u64,
    pub tickets_queued: u64,
    pub tickets_completed: u64,
    pub tickets_failed: u64,
    pub batches_dispatched: u64,
    pub max_queue_depth: u64,
    pub avg_queue_wait_ms: f64,
    pub avg_batch_size: f64,
}

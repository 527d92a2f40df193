//! Pending queue with strategy-directed batch formation.
//!
//! The queue is the only mutable state shared between intake tasks and the
//! dispatcher. All access goes through `enqueue` / `take_batch` under one
//! mutex; a `Notify` wakes the dispatcher on the empty-to-non-empty
//! transition. No critical section awaits, so the lock is a plain
//! `std::sync::Mutex`.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;

use super::metrics::SchedulerMetrics;
use super::strategy::Strategy;
use super::ticket::Ticket;

/// Tenant rotation state for FAIR formation.
///
/// `order` lists tenants in first-seen order; tenants newly appearing in a
/// formation are appended in alphabetical order among themselves. `cursor`
/// survives across formations so the rotation continues where the previous
/// batch stopped.
#[derive(Debug, Default)]
struct FairRotation {
    order: Vec<String>,
    cursor: usize,
}

struct Inner {
    /// All pending tickets, in arrival order.
    tickets: VecDeque<Ticket>,
    fair: FairRotation,
    /// Strategy of the previous formation; FAIR resets its rotation when
    /// the active strategy transitions into FAIR.
    last_strategy: Option<Strategy>,
}

/// Ordered multiset of pending tickets.
pub struct PendingQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    metrics: Arc<SchedulerMetrics>,
}

impl PendingQueue {
    pub fn new(metrics: Arc<SchedulerMetrics>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tickets: VecDeque::new(),
                fair: FairRotation::default(),
                last_strategy: None,
            }),
            notify: Notify::new(),
            metrics,
        }
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        // poisoning would mean a panic inside a formation
        self.inner.lock().expect("pending queue mutex poisoned")
    }

    /// Add a ticket and wake the dispatcher.
    pub fn enqueue(&self, ticket: Ticket) {
        self.locked().tickets.push_back(ticket);
        self.metrics.record_enqueued();
        self.notify.notify_one();
    }

    /// Number of pending tickets.
    pub fn len(&self) -> usize {
        self.locked().tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().tickets.is_empty()
    }

    /// Sleep until a ticket arrives, bounded by `wake` for liveness.
    ///
    /// `Notify` stores a permit when nobody is waiting, so an enqueue racing
    /// with the dispatcher's empty check is never lost.
    pub async fn wait_for_ticket(&self, wake: Duration) {
        let _ = tokio::time::timeout(wake, self.notify.notified()).await;
    }

    /// Remove and return up to `max` tickets, selected per `strategy`.
    ///
    /// Returns an empty vec when nothing is pending. Removal is atomic:
    /// tickets arriving after this call returns join the next formation.
    pub fn take_batch(&self, max: usize, strategy: Strategy) -> Vec<Ticket> {
        let mut inner = self.locked();

        if inner.last_strategy != Some(strategy) {
            if strategy == Strategy::Fair {
                inner.fair = FairRotation::default();
            }
            inner.last_strategy = Some(strategy);
        }

        if inner.tickets.is_empty() || max == 0 {
            return Vec::new();
        }

        let batch = match strategy {
            Strategy::Fcfs => take_fcfs(&mut inner, max),
            Strategy::Sjf => take_sjf(&mut inner, max),
            Strategy::Fair => take_fair(&mut inner, max),
        };

        for ticket in &batch {
            self.metrics.record_dequeued(ticket.enqueued_at.elapsed());
        }

        batch
    }
}

fn take_fcfs(inner: &mut Inner, max: usize) -> Vec<Ticket> {
    let take = max.min(inner.tickets.len());
    inner.tickets.drain(..take).collect()
}

fn take_sjf(inner: &mut Inner, max: usize) -> Vec<Ticket> {
    // The smallest `max` tickets by (size, arrival), in ascending order.
    let mut keys: Vec<(usize, u64)> = inner.tickets.iter().map(|t| (t.size, t.seq)).collect();
    keys.sort_unstable();
    let chosen: HashSet<u64> = keys.into_iter().take(max).map(|(_, seq)| seq).collect();

    let mut batch = Vec::with_capacity(chosen.len());
    let mut rest = VecDeque::with_capacity(inner.tickets.len() - chosen.len());
    for ticket in inner.tickets.drain(..) {
        if chosen.contains(&ticket.seq) {
            batch.push(ticket);
        } else {
            rest.push_back(ticket);
        }
    }
    inner.tickets = rest;

    batch.sort_by_key(|t| (t.size, t.seq));
    batch
}

fn take_fair(inner: &mut Inner, max: usize) -> Vec<Ticket> {
    // Append tenants not yet in the rotation, alphabetical among themselves.
    let mut newcomers: Vec<String> = Vec::new();
    for ticket in &inner.tickets {
        if !inner.fair.order.contains(&ticket.tenant) && !newcomers.contains(&ticket.tenant) {
            newcomers.push(ticket.tenant.clone());
        }
    }
    newcomers.sort();
    inner.fair.order.extend(newcomers);

    if inner.fair.order.is_empty() {
        return Vec::new();
    }

    let mut batch = Vec::new();
    let mut misses = 0;
    while batch.len() < max && !inner.tickets.is_empty() && misses < inner.fair.order.len() {
        let tenant = inner.fair.order[inner.fair.cursor].clone();
        inner.fair.cursor = (inner.fair.cursor + 1) % inner.fair.order.len();

        // oldest pending ticket of this tenant, if any
        match inner.tickets.iter().position(|t| t.tenant == tenant) {
            Some(idx) => {
                if let Some(ticket) = inner.tickets.remove(idx) {
                    batch.push(ticket);
                }
                misses = 0;
            }
            None => misses += 1,
        }
    }

    batch
}

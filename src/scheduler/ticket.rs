//! Pending-request tickets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::ProxyError;

/// Per-ticket outcome delivered on the completion handle.
pub type TicketOutcome = Result<Value, ProxyError>;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// A single pending classification request.
///
/// Created on HTTP intake and destroyed when its outcome is delivered. The
/// scheduler only ever looks at `tenant`, `size` and the arrival order; the
/// payload itself stays opaque.
pub struct Ticket {
    /// Logical origin of the request, from the customer header.
    pub tenant: String,
    /// Opaque payload forwarded verbatim downstream.
    pub payload: Value,
    /// Length measure of the payload, used only for SJF ordering.
    pub size: usize,
    /// Process-wide arrival sequence number. Stable FCFS and tie-break key.
    pub seq: u64,
    /// Intake timestamp, for queue-wait accounting.
    pub enqueued_at: Instant,
    done: oneshot::Sender<TicketOutcome>,
}

impl Ticket {
    /// Create a ticket and the receiving half of its completion handle.
    pub fn new(tenant: String, payload: Value) -> (Self, oneshot::Receiver<TicketOutcome>) {
        let (done, rx) = oneshot::channel();
        let size = payload_size(&payload);
        let ticket = Self {
            tenant,
            payload,
            size,
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            enqueued_at: Instant::now(),
            done,
        };
        (ticket, rx)
    }

    /// Publish the outcome on the completion handle.
    ///
    /// The intake task may have been cancelled and dropped its receiver;
    /// that makes the send a no-op, never an error.
    pub fn complete(self, outcome: TicketOutcome) {
        let _ = self.done.send(outcome);
    }
}

/// Length measure of an opaque payload: character count for textual items
/// (the unit of the downstream cost model), serialized length otherwise.
fn payload_size(payload: &Value) -> usize {
    match payload {
        Value::String(s) => s.chars().count(),
        other => other.to_string().len(),
    }
}

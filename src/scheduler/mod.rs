//! Batching scheduler: pending queue, strategies and the dispatch loop.
//!
//! Intake tasks enqueue tickets; one long-running dispatcher task drains the
//! queue into batches and forwards each batch as a single downstream call.
//! The dispatcher is strictly serial: at most one outstanding downstream
//! call at any time, which is what gives the ordering policies their
//! observable semantics.

mod metrics;
mod queue;
mod strategy;
mod ticket;

pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use queue::PendingQueue;
pub use strategy::{InvalidStrategy, Strategy, StrategyCell};
pub use ticket::{Ticket, TicketOutcome};

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::state::AppState;

/// Wake-up bound while the queue is empty. Keeps the loop live without
/// spinning; an enqueue notification cuts the wait short.
const IDLE_WAKE: Duration = Duration::from_millis(2);

/// Run the dispatch loop until the process exits.
///
/// One iteration: wait for work, snapshot the active strategy, form a batch
/// under the queue lock, make the downstream call, fan results (or one
/// shared error) back out positionally.
pub async fn run_dispatcher(state: Arc<AppState>) {
    let max_batch = state.config.max_batch;

    loop {
        if state.queue.is_empty() {
            state.queue.wait_for_ticket(IDLE_WAKE).await;
        }

        let strategy = state.strategy.load();
        let batch = state.queue.take_batch(max_batch, strategy);
        if batch.is_empty() {
            continue;
        }

        state.metrics.record_batch(batch.len());
        debug!(
            size = batch.len(),
            strategy = strategy.as_str(),
            "dispatching batch"
        );

        let items: Vec<Value> = batch.iter().map(|t| t.payload.clone()).collect();
        match state.downstream.classify(&items).await {
            Ok(results) => {
                // positional mapping: results[i] belongs to batch[i]
                for (ticket, result) in batch.into_iter().zip(results) {
                    state.metrics.record_completed();
                    ticket.complete(Ok(result));
                }
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "downstream call failed, failing batch");
                for ticket in batch {
                    state.metrics.record_failed();
                    ticket.complete(Err(err.clone()));
                }
            }
        }
    }
}

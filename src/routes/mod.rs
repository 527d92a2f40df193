//! HTTP route handlers.
//!
//! - `classify`: batching intake for single-item classification
//! - `strategy`: operator control surface for the active strategy
//! - `health`: health check and scheduler counters

pub mod classify;
pub mod health;
pub mod strategy;

pub use classify::proxy_classify;
pub use health::{health, metrics};
pub use strategy::{get_strategy, set_strategy};

//! Batch-formation strategies.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Queue-ordering policy for batch formation.
///
/// The three strategies are variants of one ordering policy; `take_batch`
/// dispatches on this value with a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Shortest job first: ascending payload size, earlier arrival on ties.
    Sjf,
    /// Round-robin across tenants; FCFS within a tenant.
    Fair,
    /// Strict arrival order.
    #[default]
    Fcfs,
}

/// Rejected strategy value on the control surface or in `PROXY_STRATEGY`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown strategy {0:?} (expected one of: sjf, fair, fcfs)")]
pub struct InvalidStrategy(pub String);

impl Strategy {
    /// Canonical lowercase name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sjf => "sjf",
            Strategy::Fair => "fair",
            Strategy::Fcfs => "fcfs",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Strategy::Sjf => 0,
            Strategy::Fair => 1,
            Strategy::Fcfs => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Strategy::Sjf,
            1 => Strategy::Fair,
            _ => Strategy::Fcfs,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = InvalidStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sjf" => Ok(Strategy::Sjf),
            "fair" => Ok(Strategy::Fair),
            "fcfs" => Ok(Strategy::Fcfs),
            _ => Err(InvalidStrategy(s.to_string())),
        }
    }
}

/// Process-wide active strategy.
///
/// A single-word atomic cell: switches are atomic and take effect at the
/// next batch formation, never inside one.
#[derive(Debug)]
pub struct StrategyCell(AtomicU8);

impl StrategyCell {
    pub fn new(strategy: Strategy) -> Self {
        Self(AtomicU8::new(strategy.to_u8()))
    }

    pub fn load(&self) -> Strategy {
        Strategy::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, strategy: Strategy) {
        self.0.store(strategy.to_u8(), Ordering::Relaxed);
    }
}

//! Application state and configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::downstream::DownstreamClient;
use crate::scheduler::{PendingQueue, SchedulerMetrics, Strategy, StrategyCell};

/// Application state shared by the HTTP handlers and the dispatcher
pub struct AppState {
    /// Pending tickets awaiting dispatch
    pub queue: Arc<PendingQueue>,

    /// Active batch-formation strategy
    pub strategy: StrategyCell,

    /// Downstream classification client
    pub downstream: DownstreamClient,

    /// Scheduler counters
    pub metrics: Arc<SchedulerMetrics>,

    /// Configuration
    pub config: ProxyConfig,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ProxyConfig) -> Self {
        let metrics = Arc::new(SchedulerMetrics::new());
        Self {
            queue: Arc::new(PendingQueue::new(metrics.clone())),
            strategy: StrategyCell::new(config.initial_strategy),
            downstream: DownstreamClient::new(&config.downstream_url, config.downstream_timeout),
            metrics,
            config,
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Port to listen on
    pub port: u16,

    /// Downstream classification endpoint
    pub downstream_url: String,

    /// Maximum tickets per batch
    pub max_batch: usize,

    /// Strategy active at startup
    pub initial_strategy: Strategy,

    /// Downstream round-trip deadline
    pub downstream_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            downstream_url: "http://localhost:8001/classify".to_string(),
            max_batch: 5,
            initial_strategy: Strategy::Fcfs,
            downstream_timeout: Duration::from_secs(10),
        }
    }
}

impl ProxyConfig {
    /// Create config from environment variables.
    ///
    /// An invalid `PROXY_STRATEGY` or a `MAX_BATCH` below 1 is a fatal
    /// startup error, not a silent fallback.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PROXY_PORT") {
            config.port = val
                .parse()
                .with_context(|| format!("invalid PROXY_PORT {val:?}"))?;
        }

        if let Ok(val) = std::env::var("DOWNSTREAM_URL") {
            config.downstream_url = val;
        }

        if let Ok(val) = std::env::var("MAX_BATCH") {
            config.max_batch = val
                .parse()
                .with_context(|| format!("invalid MAX_BATCH {val:?}"))?;
            if config.max_batch < 1 {
                bail!("MAX_BATCH must be at least 1");
            }
        }

        if let Ok(val) = std::env::var("PROXY_STRATEGY") {
            config.initial_strategy = val.parse()?;
        }

        if let Ok(val) = std::env::var("DOWNSTREAM_TIMEOUT_SECS") {
            let secs: u64 = val
                .parse()
                .with_context(|| format!("invalid DOWNSTREAM_TIMEOUT_SECS {val:?}"))?;
            config.downstream_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.downstream_url, "http://localhost:8001/classify");
        assert_eq!(config.max_batch, 5);
        assert_eq!(config.initial_strategy, Strategy::Fcfs);
    }

    #[test]
    fn test_state_starts_with_initial_strategy() {
        let config = ProxyConfig {
            initial_strategy: Strategy::Sjf,
            ..Default::default()
        };
        let state = AppState::new(config);
        assert_eq!(state.strategy.load(), Strategy::Sjf);
    }
}

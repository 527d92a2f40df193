//! Batching proxy binary.
//!
//! For library usage, see [`batchproxy`].

use batchproxy::{run_server, ProxyConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("batchproxy=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Invalid strategy or batch bound is a fatal startup error
    let config = ProxyConfig::from_env()?;

    run_server(config).await
}

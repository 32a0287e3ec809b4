use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use ratelog::config::{RatelogConfig, Strategy};
use ratelog::limit::{self, Limiter};

/// Flood a rate-limited logger and watch it throttle.
#[derive(Parser)]
#[command(name = "ratelog", version)]
struct Args {
    /// Admission strategy to exercise
    #[arg(long, value_enum, default_value_t = Strategy::TokenBucket)]
    strategy: Strategy,

    /// Messages admitted per second
    #[arg(long, default_value_t = 100)]
    rate: u64,

    /// Messages to push through the limiter
    #[arg(long, default_value_t = 1000)]
    count: u64,

    /// YAML configuration file; overrides --strategy and --rate
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RatelogConfig::from_file(path)?,
        None => RatelogConfig {
            strategy: args.strategy,
            logs_per_second: args.rate,
            burst_capacity: None,
        },
    };

    info!(
        strategy = ?config.strategy,
        rate = config.logs_per_second,
        count = args.count,
        "Flooding rate-limited logger"
    );

    let mut limiter = limit::from_config(&config)?;
    for i in 0..args.count {
        limiter.info(&format!("message {}", i));
    }

    // The leaky bucket buffers a burst instead of rejecting it; give the
    // worker time to drain what fit in the queue before shutting down.
    if config.strategy == Strategy::LeakyBucket {
        tokio::time::sleep(Duration::from_millis(1100)).await;
    }

    limiter.shutdown().await;
    info!("Done");

    Ok(())
}

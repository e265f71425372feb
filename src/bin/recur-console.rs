//! Drives the timer under parallel load: many unlimited chains printing
//! at staggered intervals until the run window elapses.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use recur::Timer;
use tracing::info;

/// recur-console - schedule many concurrent unlimited callback chains
#[derive(Parser)]
#[command(name = "recur-console")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of concurrent chains to schedule
    #[arg(short, long, default_value = "20")]
    chains: u32,

    /// Interval step in milliseconds (chain N ticks every N * step)
    #[arg(short, long, default_value = "5")]
    step_ms: u64,

    /// How long to run before cancelling everything, in seconds
    #[arg(short, long, default_value = "10")]
    run_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), recur::TimerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let timer = Arc::new(Timer::new());

    // Register from parallel tasks to exercise concurrent starts.
    let mut registrations = Vec::new();
    for chain_id in 1..=cli.chains {
        let timer = Arc::clone(&timer);
        let interval_ms = u64::from(chain_id) * cli.step_ms;
        registrations.push(tokio::spawn(async move {
            let print_count = Arc::new(AtomicU32::new(0));
            timer.start(
                move |_signal| {
                    let n = print_count.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(chain_id, interval_ms, print_count = n, "tick");
                    std::future::ready(())
                },
                Duration::from_millis(interval_ms),
                Timer::UNLIMITED_RECURRENCE,
            )
        }));
    }

    for registration in registrations {
        registration.await.expect("registration task panicked")?;
    }
    info!(chains = cli.chains, "all chains scheduled");

    tokio::time::sleep(Duration::from_secs(cli.run_secs)).await;
    timer.stop();
    info!(tracked = timer.tracked_count(), "all chains cancelled");
    Ok(())
}

//! Showcases the nondeterministic snapshot taken by `Timer::stop`.
//!
//! Many workers race: one calls `stop` while the rest schedule finite
//! chains. Chains whose start landed before the snapshot are cancelled;
//! chains that landed after keep running. Which is which depends entirely
//! on task interleaving; the only hard guarantee is that the tracking
//! set stays internally consistent.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use recur::Timer;
use tracing::info;

/// recur-stop - race concurrent starts against a single stop
#[derive(Parser)]
#[command(name = "recur-stop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of racing workers (one of them calls stop)
    #[arg(short, long, default_value = "50")]
    workers: u32,

    /// Recurrence of each scheduled chain
    #[arg(short, long, default_value = "100")]
    recurrence: i32,

    /// How long to observe the surviving chains, in seconds
    #[arg(long, default_value = "5")]
    observe_secs: u64,
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
    let stopper = cli.workers / 2;

    let mut workers = Vec::new();
    for worker_id in 1..=cli.workers {
        let timer = Arc::clone(&timer);
        let recurrence = cli.recurrence;
        workers.push(tokio::spawn(async move {
            if worker_id == stopper {
                timer.stop();
                Ok(None)
            } else {
                timer
                    .start(
                        move |_signal| {
                            info!(worker_id, "chain has not been cancelled yet");
                            std::future::ready(())
                        },
                        Duration::from_millis(100 + u64::from(worker_id)),
                        recurrence,
                    )
                    .map(Some)
            }
        }));
    }

    for worker in workers {
        worker.await.expect("worker task panicked")?;
    }
    info!(
        tracked = timer.tracked_count(),
        "stop raced against {} starts; surviving chains keep ticking",
        cli.workers - 1
    );

    tokio::time::sleep(Duration::from_secs(cli.observe_secs)).await;
    timer.stop();
    info!(tracked = timer.tracked_count(), "final stop issued");
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracked_queue::{append_stats, TrackedQueue};

/// Run a producer/consumer pipeline through a TrackedQueue
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of producer threads
    #[arg(long, default_value_t = 1)]
    producers: usize,

    /// Number of consumer threads
    #[arg(long, default_value_t = 4)]
    consumers: usize,

    /// Items pushed by each producer
    #[arg(long, default_value_t = 4000)]
    items: usize,

    /// A consumer stops after waiting this long for an item
    #[arg(long, default_value_t = 100)]
    timeout_ms: u64,

    /// Simulated work per item
    #[arg(long, default_value_t = 0)]
    work_ms: u64,

    /// Append queue stats as NDJSON to this file
    #[arg(long)]
    stats_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let queue = Arc::new(TrackedQueue::<(usize, usize)>::new());
    let timeout = Duration::from_millis(args.timeout_ms);
    let work = Duration::from_millis(args.work_ms);
    let started = Instant::now();

    let mut consumers = Vec::new();
    for id in 0..args.consumers {
        let queue = queue.clone();
        consumers.push(thread::spawn(move || {
            let mut handled = 0usize;
            while let Ok((_item, _done)) = queue.pop_with_guard_timeout(timeout) {
                if !work.is_zero() {
                    thread::sleep(work);
                }
                handled += 1;
            }
            info!(consumer = id, handled, "consumer idle, stopping");
            handled
        }));
    }

    let mut producers = Vec::new();
    for id in 0..args.producers {
        let queue = queue.clone();
        let items = args.items;
        producers.push(thread::spawn(move || {
            for seq in 0..items {
                queue.push((id, seq));
            }
        }));
    }

    for handle in producers {
        handle.join().map_err(|_| anyhow!("producer thread panicked"))?;
    }
    let after_produce = queue.stats();

    // Consumers may time out before the last item is done if producers are slow.
    let mut handled = 0;
    for handle in consumers {
        handled += handle.join().map_err(|_| anyhow!("consumer thread panicked"))?;
    }
    while let Some((_item, _done)) = queue.try_pop_with_guard() {
        handled += 1;
    }
    queue.join();

    let finished = queue.stats();
    info!(
        handled,
        enqueued = finished.enqueued_total,
        elapsed = ?started.elapsed(),
        "pipeline drained"
    );

    if let Some(path) = args.stats_out {
        append_stats(&[after_produce, finished], &path)?;
        info!(path = %path.display(), "stats appended");
    }
    Ok(())
}

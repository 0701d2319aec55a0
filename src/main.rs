// Load driver for the stealthswarm execution engine.
//
// Floods the executor with short navigation tasks against a bounded
// browser/context pool and prints stats snapshots while it runs. All
// pooling behavior lives in the library; this binary only wires flags to
// a config and generates load.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use tokio::time::Instant;

use stealthswarm::{SwarmConfig, chromium_executor};

#[derive(Parser, Debug)]
#[command(name = "stealthswarm", about = "High-volume pooled browser task runner")]
struct Args {
    /// Target URL each task navigates to
    #[arg(default_value = "about:blank")]
    url: String,

    /// Maximum concurrently executing tasks
    #[arg(long, default_value_t = 50)]
    concurrent: usize,

    /// Maximum browser processes
    #[arg(long, default_value_t = 10)]
    browsers: usize,

    /// Maximum contexts per browser
    #[arg(long, default_value_t = 10)]
    contexts_per_browser: usize,

    /// Seconds between stats snapshots
    #[arg(long, default_value_t = 10)]
    watch_duration: u64,

    /// Total run time in seconds
    #[arg(long, default_value_t = 60)]
    duration: u64,

    /// Process memory ceiling in MiB (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    memory_limit: u64,

    /// File with one proxy URL per line; rotated across tasks
    #[arg(long)]
    proxy_file: Option<PathBuf>,

    /// Run browsers with a visible window
    #[arg(long)]
    headed: bool,
}

fn load_proxies(path: &PathBuf) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read proxy file {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("chromiumoxide::handler", log::LevelFilter::Off)
        .filter_module("chromiumoxide::conn", log::LevelFilter::Off)
        .init();

    let args = Args::parse();

    let config = SwarmConfig::builder()
        .max_concurrent(args.concurrent)
        .max_browsers(args.browsers)
        .max_contexts_per_browser(args.contexts_per_browser)
        .memory_limit_mb(args.memory_limit)
        .headless(!args.headed)
        .build()?;

    let proxies = match &args.proxy_file {
        Some(path) => {
            let list = load_proxies(path)?;
            log::info!("Loaded {} proxies from {}", list.len(), path.display());
            list
        }
        None => Vec::new(),
    };

    let executor = Arc::new(chromium_executor(config));
    executor.start().await?;

    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let proxy_cursor = Arc::new(AtomicUsize::new(0));

    log::info!(
        "Running {} concurrent tasks against {} for {}s",
        args.concurrent,
        args.url,
        args.duration
    );

    let mut workers = Vec::with_capacity(args.concurrent);
    for worker_id in 0..args.concurrent {
        let executor = Arc::clone(&executor);
        let proxies = proxies.clone();
        let proxy_cursor = Arc::clone(&proxy_cursor);
        let url = args.url.clone();

        workers.push(tokio::spawn(async move {
            while Instant::now() < deadline {
                let proxy = if proxies.is_empty() {
                    None
                } else {
                    let index = proxy_cursor.fetch_add(1, Ordering::Relaxed) % proxies.len();
                    Some(proxies[index].clone())
                };

                let target = url.clone();
                let result = executor
                    .execute(None, proxy.as_deref(), |page, cancel| async move {
                        if cancel.is_cancelled() {
                            anyhow::bail!("shutting down");
                        }
                        page.goto(&target).await?;
                        let body = page.content().await?;
                        Ok(body.len())
                    })
                    .await;

                if let Err(e) = result {
                    log::debug!("Worker {worker_id}: task failed: {e}");
                }

                // Small jitter so workers don't hammer the pools in lockstep.
                let pause = rand::rng().random_range(10..100);
                tokio::time::sleep(Duration::from_millis(pause)).await;
            }
        }));
    }

    let watcher = {
        let executor = Arc::clone(&executor);
        let interval = Duration::from_secs(args.watch_duration.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if Instant::now() >= deadline {
                    break;
                }
                let stats = executor.stats().await;
                match serde_json::to_string(&stats) {
                    Ok(json) => log::info!("stats {json}"),
                    Err(e) => log::warn!("Failed to serialize stats: {e}"),
                }
            }
        })
    };

    for worker in workers {
        if let Err(e) = worker.await {
            log::warn!("Worker panicked: {e}");
        }
    }
    watcher.abort();

    executor.stop(Duration::from_secs(30)).await;

    let stats = executor.stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

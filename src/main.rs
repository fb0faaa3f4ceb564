use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use imot_scraper::config::Config;
use imot_scraper::crawler::{CrawlService, HttpFetcher};

/// Pilot crawl of imot.bg Sofia apartment sales (1/2/3-room categories).
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Max result pages per room category; 0 walks until an empty page
    #[arg(long, default_value_t = 2)]
    pages: u32,

    /// Delay between requests, in seconds
    #[arg(long, default_value_t = 1.0)]
    delay: f64,

    /// Prefix for output CSVs; the room count and `_pilot.csv` are appended
    #[arg(long, default_value = "data/raw/raw_room")]
    output_prefix: String,

    /// Log progress every N listings
    #[arg(long, default_value_t = 10)]
    log_every: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let max_pages = if args.pages == 0 {
        None
    } else {
        Some(args.pages)
    };
    let cfg = Config::default()
        .with_delay(Duration::from_secs_f64(args.delay))
        .with_max_pages(max_pages)
        .with_log_every(args.log_every);

    let fetcher = HttpFetcher::new(&cfg)?;
    let prefix = args.output_prefix.clone();

    let total = CrawlService::run_all(&cfg, &fetcher, |rooms| {
        PathBuf::from(format!("{prefix}{rooms}_pilot.csv"))
    })
    .await;

    info!(total, "pilot scrape finished");
    Ok(())
}

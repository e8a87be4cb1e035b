//! # Job Feed
//!
//! Polls a small, fixed set of job boards, keeps the postings whose titles
//! match a keyword list, remembers every match it has ever seen, and renders
//! the lot as a static "Bedtime Job Feed" HTML page.
//!
//! ## Usage
//!
//! ```sh
//! job_feed -d jobs_db.json -o index.html
//! ```
//!
//! ## Architecture
//!
//! 1. **Load**: read previously seen postings from the known-postings file
//! 2. **Fetch**: scrape Greenhouse/Lever boards and query Ashby's API concurrently
//! 3. **Filter & dedup**: keep keyword matches, record the ones not seen before
//! 4. **Persist**: write the known-postings file back atomically
//! 5. **Output**: rebuild the HTML feed, flagging this run's new postings
//!
//! A board that fails is logged and skipped. Only a known-postings file that
//! cannot be read or written makes the process exit nonzero.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod cli;
mod config;
mod error;
mod filter;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use config::FeedConfig;
use filter::KeywordFilter;
use outputs::html;
use pipeline::Aggregator;
use scrapers::HttpFetcher;
use store::DedupStore;
use utils::ensure_parent_writable;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("job_feed starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let timeout = Duration::from_secs(args.timeout_secs);

    if let Some(ref target) = args.probe {
        let url = Url::parse(target)?;
        let client = scrapers::build_client(timeout)?;
        scrapers::probe(&client, &url).await?;
        return Ok(());
    }

    // ---- Config ----
    let feed = match args.config {
        Some(ref path) => FeedConfig::load(path).await?,
        None => {
            info!("No config file given; using built-in sources");
            FeedConfig::default()
        }
    };
    feed.validate()?;

    // Fail before any network I/O if the results have nowhere to go
    let db_path = Path::new(&args.db_file);
    let output_path = Path::new(&args.output);
    for path in [db_path, output_path] {
        if let Err(e) = ensure_parent_writable(path).await {
            error!(path = %path.display(), error = %e, "Output location is not writable");
            return Err(e);
        }
    }

    // ---- Run ----
    let fetcher = HttpFetcher::new(timeout)?.with_ashby_api_base(Url::parse(&args.ashby_api_base)?);
    let keywords = KeywordFilter::new(&feed.keywords);
    info!(
        sources = feed.sources.len(),
        keywords = keywords.len(),
        concurrency = args.concurrency,
        "Starting job hunt"
    );
    let aggregator =
        Aggregator::new(fetcher, feed.sources, keywords).with_concurrency(args.concurrency);

    let store = DedupStore::new(db_path);
    let today = Local::now().date_naive();
    let result = match aggregator.run(&store, today).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Known postings could not be loaded or saved; aborting");
            return Err(e.into());
        }
    };

    // ---- HTML output ----
    if let Err(e) = html::write_report(&result, &Local::now(), output_path).await {
        error!(path = %output_path.display(), error = %e, "Failed writing job feed");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        new = result.new_postings.len(),
        known = result.all_known.len(),
        failed_sources = result.failures.len(),
        "Dashboard updated"
    );

    Ok(())
}

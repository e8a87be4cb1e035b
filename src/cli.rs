//! Command-line interface definitions for the job feed.
//!
//! All arguments can be provided via command-line flags or environment variables.

use crate::pipeline::DEFAULT_CONCURRENCY;
use crate::scrapers::DEFAULT_TIMEOUT;
use crate::scrapers::ashby::DEFAULT_API_BASE;
use clap::Parser;

/// Command-line arguments for a single feed run.
///
/// # Examples
///
/// ```sh
/// # Built-in boards, state and page in the current directory
/// job_feed
///
/// # Custom boards, publish into a web root
/// job_feed --config config/sources.yaml -d /var/lib/job_feed/jobs_db.json -o /srv/www/index.html
///
/// # Check why a board stopped yielding postings
/// job_feed --probe https://boards.greenhouse.io/datadog
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Known-postings file; created on first run
    #[arg(short, long, env = "JOB_FEED_DB", default_value = "jobs_db.json")]
    pub db_file: String,

    /// Where to write the HTML feed
    #[arg(short, long, env = "JOB_FEED_OUTPUT", default_value = "index.html")]
    pub output: String,

    /// YAML file listing keywords and sources (defaults to the built-in list)
    #[arg(short, long, env = "JOB_FEED_CONFIG")]
    pub config: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Number of boards fetched at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Root of the Ashby posting API; the board slug is appended
    #[arg(long, env = "ASHBY_API_BASE", default_value = DEFAULT_API_BASE)]
    pub ashby_api_base: String,

    /// Fetch one URL with browser headers, log what came back, and exit
    #[arg(long, value_name = "URL")]
    pub probe: Option<String>,
}

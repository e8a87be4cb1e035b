//! Ashby board client.
//!
//! Ashby boards (`https://jobs.ashbyhq.com/<slug>`) render client-side, so
//! instead of scraping HTML we POST an empty JSON object to the public posting
//! API at `https://api.ashbyhq.com/posting-api/job-board/<slug>` and read the
//! `jobs` array from the response.

use super::check_status;
use crate::error::FetchErrorKind;
use crate::models::{Posting, SourceDescriptor};
use crate::utils::clean_text;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.ashbyhq.com/posting-api/job-board/";

pub fn default_api_base() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("valid default api base")
}

#[derive(Debug, Deserialize)]
struct JobBoard {
    #[serde(default)]
    jobs: Vec<BoardJob>,
}

#[derive(Debug, Deserialize)]
struct BoardJob {
    title: Option<String>,
    #[serde(rename = "jobUrl")]
    job_url: Option<String>,
}

/// Posting API URL for the board's slug.
pub fn api_endpoint(api_base: &Url, source: &SourceDescriptor) -> Result<Url, FetchErrorKind> {
    let slug = source
        .slug()
        .ok_or_else(|| FetchErrorKind::BadEndpoint(format!("no board slug in {}", source.url)))?;

    let mut base = api_base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&urlencoding::encode(&slug))
        .map_err(|e| FetchErrorKind::BadEndpoint(e.to_string()))
}

#[instrument(level = "info", skip_all, fields(url = %source.url))]
pub async fn fetch(
    client: &Client,
    api_base: &Url,
    source: &SourceDescriptor,
) -> Result<Vec<Posting>, FetchErrorKind> {
    let endpoint = api_endpoint(api_base, source)?;
    debug!(%endpoint, "Querying posting API");

    let response = client
        .post(endpoint)
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .json(&serde_json::json!({}))
        .send()
        .await?;
    let body = check_status(response)?.text().await?;
    parse_postings(&body, &source.name)
}

/// Extract postings from a posting API response.
///
/// Jobs missing a title or a URL are skipped; a response without `jobs` is an empty board.
pub fn parse_postings(body: &str, source_name: &str) -> Result<Vec<Posting>, FetchErrorKind> {
    let board: JobBoard =
        serde_json::from_str(body).map_err(|e| FetchErrorKind::Parse(e.to_string()))?;

    let postings = board
        .jobs
        .into_iter()
        .filter_map(|job| {
            let title = clean_text(&job.title?);
            let url = job.job_url?.trim().to_string();
            if title.is_empty() || url.is_empty() {
                return None;
            }
            Some(Posting::new(title, url, source_name))
        })
        .collect();
    Ok(postings)
}

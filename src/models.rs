//! Data models for job sources, scraped postings and the results of a run.
//!
//! - [`SourceDescriptor`]: one configured job board and the parsing rules it needs
//! - [`Posting`]: a candidate posting scraped from a board
//! - [`KnownPosting`]: the metadata persisted for every posting seen so far
//! - [`RunResult`]: what a single pipeline run hands to the report renderer

use crate::error::FetchError;
use crate::store::KnownPostings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use url::Url;

/// The closed set of board shapes the adapters know how to parse.
///
/// | Kind | Transport | Listing rule |
/// |------|-----------|--------------|
/// | `greenhouse` | HTML GET | `div.opening` with an inner anchor |
/// | `lever` | HTML GET | `div.posting` with an `a.posting-title` holding an `h5` |
/// | `ashby` | JSON POST | `jobs[].title` / `jobs[].jobUrl` from the posting API |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Greenhouse,
    Lever,
    Ashby,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Greenhouse => "greenhouse",
            SourceKind::Lever => "lever",
            SourceKind::Ashby => "ashby",
        };
        f.write_str(name)
    }
}

/// A job board to poll.
///
/// `name` doubles as the company recorded for every posting the board yields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceDescriptor {
    /// Display name, also stored as the posting's company.
    pub name: String,
    /// Public board URL, e.g. `https://jobs.lever.co/palantir`.
    pub url: String,
    /// Which adapter parses this board.
    pub kind: SourceKind,
    /// Pause after each request to this board's origin, for rate-sensitive boards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub politeness_delay_ms: Option<u64>,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind,
            politeness_delay_ms: None,
        }
    }

    /// Parsed board URL.
    pub fn endpoint(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.url)
    }

    /// Last non-empty path segment of the board URL, percent-decoded.
    ///
    /// `https://jobs.ashbyhq.com/linear/` -> `linear`
    pub fn slug(&self) -> Option<String> {
        let url = self.endpoint().ok()?;
        let segment = url
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .last()?;
        urlencoding::decode(segment).ok().map(|s| s.into_owned())
    }

    pub fn politeness_delay(&self) -> Option<Duration> {
        self.politeness_delay_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// A candidate posting produced by an adapter. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub title: String,
    /// Absolute URL; identifies the job across every source.
    pub url: String,
    pub source_name: String,
}

impl Posting {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source_name: source_name.into(),
        }
    }
}

/// Metadata stored for a posting the first time it is seen.
///
/// The URL is the key of the surrounding [`KnownPostings`] map, so it is not
/// repeated here. Serialized as `{"company": .., "title": .., "date": "YYYY-MM-DD"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KnownPosting {
    pub company: String,
    pub title: String,
    /// First-seen date.
    pub date: NaiveDate,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// URLs recorded for the first time during this run.
    pub new_postings: BTreeSet<String>,
    /// Every known posting after this run, including the new ones.
    pub all_known: KnownPostings,
    /// Sources that failed this run, in configuration order.
    pub failures: Vec<FetchError>,
}

impl RunResult {
    pub fn is_new(&self, url: &str) -> bool {
        self.new_postings.contains(url)
    }
}

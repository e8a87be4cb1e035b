//! Persisted record of every posting seen so far.
//!
//! The file is a single JSON object keyed by posting URL:
//!
//! ```text
//! {
//!     "https://jobs.lever.co/palantir/abc": {
//!         "company": "Palantir",
//!         "title": "Forward Deployed Engineer",
//!         "date": "2024-03-07"
//!     }
//! }
//! ```
//!
//! A missing file means nothing is known yet. A file that exists but does not
//! parse is an error; it is never silently reset.

use crate::error::StoreError;
use crate::models::KnownPosting;
use crate::utils::write_atomically;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// URL -> first-seen metadata. Entries are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct KnownPostings(BTreeMap<String, KnownPosting>);

impl KnownPostings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains_key(url)
    }

    #[cfg(test)]
    pub fn get(&self, url: &str) -> Option<&KnownPosting> {
        self.0.get(url)
    }

    /// Record a posting on first sighting.
    ///
    /// Returns `false` and leaves the existing entry untouched when `url` is
    /// already known, so the first-seen date is never overwritten.
    pub fn record(
        &mut self,
        url: &str,
        company: &str,
        title: &str,
        date: NaiveDate,
    ) -> bool {
        if self.contains(url) {
            return false;
        }
        self.0.insert(
            url.to_string(),
            KnownPosting {
                company: company.to_string(),
                title: title.to_string(),
                date,
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KnownPosting)> {
        self.0.iter()
    }
}

/// File-backed home of [`KnownPostings`].
#[derive(Debug, Clone)]
pub struct DedupStore {
    path: PathBuf,
}

impl DedupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the known postings, or an empty map when the file does not exist.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<KnownPostings, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No known postings file yet; starting empty");
                return Ok(KnownPostings::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let known: KnownPostings =
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        info!(count = known.len(), "Loaded known postings");
        Ok(known)
    }

    /// Replace the file with `known`. The old content stays intact if the write fails.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = known.len()))]
    pub async fn persist(&self, known: &KnownPostings) -> Result<(), StoreError> {
        let write_error = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        known
            .serialize(&mut ser)
            .map_err(|e| write_error(e.into()))?;
        buf.push(b'\n');

        write_atomically(&self.path, &buf)
            .await
            .map_err(write_error)?;
        debug!(bytes = buf.len(), "Persisted known postings");
        Ok(())
    }
}

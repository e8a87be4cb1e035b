//! The fetch → filter → dedup pipeline.
//!
//! # Architecture
//!
//! 1. **Load**: read the known postings from the [`DedupStore`]
//! 2. **Fetch**: run every source's adapter concurrently (bounded)
//! 3. **Merge**: single-threaded, in source order, record each keyword match
//!    that is not yet known
//! 4. **Persist**: write the updated map back in one piece
//!
//! A failing source is logged, kept in [`RunResult::failures`], and skipped.
//! Only store errors abort a run.

use crate::error::StoreError;
use crate::filter::KeywordFilter;
use crate::models::{RunResult, SourceDescriptor, SourceKind};
use crate::scrapers::{FetchSource, SourceFetch};
use crate::store::{DedupStore, KnownPostings};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::sleep;
use tracing::{error, info, instrument};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Drives one complete run over a fixed set of sources.
#[derive(Debug)]
pub struct Aggregator<F> {
    fetcher: F,
    sources: Vec<SourceDescriptor>,
    filter: KeywordFilter,
    concurrency: usize,
}

impl<F: FetchSource> Aggregator<F> {
    pub fn new(fetcher: F, sources: Vec<SourceDescriptor>, filter: KeywordFilter) -> Self {
        Self {
            fetcher,
            sources,
            filter,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum number of sources fetched at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Load, collect and persist.
    ///
    /// Fails only when the store cannot be read or written; in that case the
    /// file on disk is left as it was.
    #[instrument(level = "info", skip_all, fields(store = %store.path().display(), %today))]
    pub async fn run(&self, store: &DedupStore, today: NaiveDate) -> Result<RunResult, StoreError> {
        let known = store.load().await?;
        let result = self.collect(known, today).await;
        store.persist(&result.all_known).await?;
        Ok(result)
    }

    /// Fetch every source and fold the matches into `known`.
    ///
    /// No file system access; the map goes in and comes back out in the result.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len(), known = known.len()))]
    pub async fn collect(&self, mut known: KnownPostings, today: NaiveDate) -> RunResult {
        let throttle = Throttle::default();

        // `buffered` keeps source order so the merge is deterministic.
        let fetches: Vec<SourceFetch> = stream::iter(self.sources.iter())
            .map(|source| throttle.fetch(&self.fetcher, source))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut result = RunResult::default();
        let mut scanned = 0usize;
        let mut matched = 0usize;

        for (source, fetched) in self.sources.iter().zip(fetches) {
            if let Some(e) = fetched.error {
                error!(source = %source.name, error = %e.kind, "Source failed; skipping");
                result.failures.push(e);
                continue;
            }

            scanned += fetched.postings.len();
            for posting in fetched.postings {
                if !self.filter.matches(&posting.title) {
                    continue;
                }
                matched += 1;
                if known.record(&posting.url, &source.name, &posting.title, today) {
                    info!(source = %source.name, title = %posting.title, url = %posting.url, "New match");
                    result.new_postings.insert(posting.url);
                }
            }
        }

        info!(
            scanned,
            matched,
            new = result.new_postings.len(),
            failed = result.failures.len(),
            known = known.len(),
            "Run collected"
        );
        result.all_known = known;
        result
    }
}

/// Spaces out requests to boards that ask for it.
///
/// Sources of the same kind share an origin, so flagged sources take a gate
/// per kind, fetch, and wait out their delay before releasing it.
#[derive(Debug, Default)]
struct Throttle {
    gates: Mutex<HashMap<SourceKind, Arc<tokio::sync::Mutex<()>>>>,
}

impl Throttle {
    fn gate(&self, kind: SourceKind) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(kind).or_default())
    }

    async fn fetch<F: FetchSource>(&self, fetcher: &F, source: &SourceDescriptor) -> SourceFetch {
        let Some(delay) = source.politeness_delay() else {
            return fetcher.fetch(source).await;
        };

        let gate = self.gate(source.kind);
        let _held = gate.lock().await;
        let fetched = fetcher.fetch(source).await;
        sleep(delay).await;
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchErrorKind};
    use crate::models::Posting;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Canned responses per source name, with an optional artificial latency.
    #[derive(Debug, Default)]
    struct StubFetcher {
        responses: HashMap<String, SourceFetch>,
        latency: HashMap<String, Duration>,
        log: Mutex<Vec<(String, Instant)>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl StubFetcher {
        fn returning(mut self, name: &str, postings: &[(&str, &str)]) -> Self {
            let postings = postings
                .iter()
                .map(|(title, url)| Posting::new(*title, *url, name))
                .collect();
            self.responses.insert(name.to_string(), SourceFetch::ok(postings));
            self
        }

        fn failing(mut self, name: &str, kind: FetchErrorKind) -> Self {
            self.responses
                .insert(name.to_string(), SourceFetch::failed(FetchError::new(name, kind)));
            self
        }

        fn slow(mut self, name: &str, latency: Duration) -> Self {
            self.latency.insert(name.to_string(), latency);
            self
        }
    }

    impl FetchSource for StubFetcher {
        async fn fetch(&self, source: &SourceDescriptor) -> SourceFetch {
            self.log.lock().unwrap().push((source.name.clone(), Instant::now()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(latency) = self.latency.get(&source.name) {
                sleep(*latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.responses.get(&source.name).cloned().unwrap_or_default()
        }
    }

    fn source(name: &str) -> SourceDescriptor {
        SourceDescriptor::new(name, format!("https://boards.greenhouse.io/{name}"), SourceKind::Greenhouse)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn urls(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_single_source_keeps_only_matches() {
        let fetcher = StubFetcher::default().returning(
            "X",
            &[("Solutions Engineer", "https://x/1"), ("Backend Engineer", "https://x/2")],
        );
        let aggregator = Aggregator::new(
            fetcher,
            vec![source("X")],
            KeywordFilter::new(["Solutions Engineer"]),
        );

        let result = aggregator.collect(KnownPostings::new(), today()).await;

        assert_eq!(result.new_postings, urls(&["https://x/1"]));
        assert_eq!(result.all_known.len(), 1);
        let entry = result.all_known.get("https://x/1").unwrap();
        assert_eq!(entry.company, "X");
        assert_eq!(entry.title, "Solutions Engineer");
        assert_eq!(entry.date, today());
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn test_second_run_reports_nothing_new() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::new(dir.path().join("jobs_db.json"));
        let fetcher = StubFetcher::default().returning(
            "X",
            &[("Solutions Engineer", "https://x/1"), ("Sales Engineer", "https://x/2")],
        );
        let aggregator = Aggregator::new(
            fetcher,
            vec![source("X")],
            KeywordFilter::new(["Solutions Engineer", "Sales Engineer"]),
        );

        let first = aggregator.run(&store, today()).await.unwrap();
        assert_eq!(first.new_postings, urls(&["https://x/1", "https://x/2"]));

        let later = today().succ_opt().unwrap();
        let second = aggregator.run(&store, later).await.unwrap();
        assert!(second.new_postings.is_empty());
        assert_eq!(second.all_known, first.all_known);
        assert_eq!(second.all_known.get("https://x/1").unwrap().date, today());
    }

    #[tokio::test]
    async fn test_timeout_on_one_source_does_not_abort_run() {
        let fetcher = StubFetcher::default()
            .failing("Slow", FetchErrorKind::Timeout)
            .returning(
                "Fast",
                &[("Sales Engineer", "https://f/1"), ("Partner Engineer", "https://f/2")],
            );
        let aggregator = Aggregator::new(
            fetcher,
            vec![source("Slow"), source("Fast")],
            KeywordFilter::new(["Sales Engineer", "Partner Engineer"]),
        );

        let result = aggregator.collect(KnownPostings::new(), today()).await;

        assert_eq!(result.new_postings, urls(&["https://f/1", "https://f/2"]));
        assert_eq!(
            result.failures,
            vec![FetchError::new("Slow", FetchErrorKind::Timeout)]
        );
    }

    #[tokio::test]
    async fn test_all_sources_failing_keeps_known_postings() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::new(dir.path().join("jobs_db.json"));
        let mut known = KnownPostings::new();
        known.record("https://old/1", "Old Co", "Sales Engineer", today());
        store.persist(&known).await.unwrap();

        let fetcher = StubFetcher::default()
            .failing("A", FetchErrorKind::Http(503))
            .failing("B", FetchErrorKind::Parse("bad json".to_string()));
        let aggregator = Aggregator::new(
            fetcher,
            vec![source("A"), source("B")],
            KeywordFilter::new(["Engineer"]),
        );

        let result = aggregator.run(&store, today()).await.unwrap();
        assert!(result.new_postings.is_empty());
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.all_known, known);
        assert_eq!(store.load().await.unwrap(), known);
    }

    #[tokio::test]
    async fn test_duplicate_url_across_sources_first_source_wins() {
        // The first source answers last; merge order still follows the config.
        let fetcher = StubFetcher::default()
            .returning("First", &[("Solutions Engineer", "https://shared/1")])
            .returning("Second", &[("Solutions Engineer II", "https://shared/1")])
            .slow("First", Duration::from_millis(50));
        let aggregator = Aggregator::new(
            fetcher,
            vec![source("First"), source("Second")],
            KeywordFilter::new(["Solutions Engineer"]),
        );

        let result = aggregator.collect(KnownPostings::new(), today()).await;

        assert_eq!(result.new_postings, urls(&["https://shared/1"]));
        let entry = result.all_known.get("https://shared/1").unwrap();
        assert_eq!(entry.company, "First");
        assert_eq!(entry.title, "Solutions Engineer");
    }

    #[tokio::test]
    async fn test_already_known_posting_is_not_new() {
        let mut known = KnownPostings::new();
        let earlier = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        known.record("https://x/1", "X", "Solutions Engineer", earlier);

        let fetcher = StubFetcher::default().returning("X", &[("Solutions Engineer", "https://x/1")]);
        let aggregator = Aggregator::new(
            fetcher,
            vec![source("X")],
            KeywordFilter::new(["Solutions Engineer"]),
        );

        let result = aggregator.collect(known, today()).await;
        assert!(result.new_postings.is_empty());
        assert_eq!(result.all_known.get("https://x/1").unwrap().date, earlier);
    }

    #[tokio::test]
    async fn test_corrupt_store_aborts_before_fetching() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobs_db.json");
        std::fs::write(&path, "{ not json").unwrap();

        let aggregator = Aggregator::new(
            StubFetcher::default(),
            vec![source("X")],
            KeywordFilter::new(["Engineer"]),
        );
        let err = aggregator.run(&DedupStore::new(&path), today()).await.unwrap_err();

        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(aggregator.fetcher.log.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_fetches_overlap_up_to_concurrency_limit() {
        let latency = Duration::from_millis(100);
        let names = ["A", "B", "C", "D", "E", "F"];
        let fetcher = names
            .iter()
            .fold(StubFetcher::default(), |stub, name| stub.slow(name, latency));
        let aggregator = Aggregator::new(
            fetcher,
            names.iter().map(|name| source(name)).collect(),
            KeywordFilter::new(["Engineer"]),
        )
        .with_concurrency(2);

        let started = Instant::now();
        aggregator.collect(KnownPostings::new(), today()).await;
        let elapsed = started.elapsed();

        assert_eq!(aggregator.fetcher.peak_in_flight.load(Ordering::SeqCst), 2);
        // six sources, two at a time: three rounds, not six
        assert!(elapsed >= latency * 3, "finished in {elapsed:?}");
        assert!(elapsed < latency * 6, "fetches did not overlap: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_politeness_delay_spaces_same_kind_sources() {
        let delay = Duration::from_millis(100);
        let mut a = source("A");
        a.politeness_delay_ms = Some(100);
        let mut b = source("B");
        b.politeness_delay_ms = Some(100);

        let aggregator = Aggregator::new(
            StubFetcher::default(),
            vec![a, b],
            KeywordFilter::new(["Engineer"]),
        )
        .with_concurrency(2);
        aggregator.collect(KnownPostings::new(), today()).await;

        let log = aggregator.fetcher.log.lock().unwrap();
        assert_eq!(log.len(), 2);
        let gap = log[1].1.duration_since(log[0].1);
        assert!(gap >= delay, "requests only {gap:?} apart");
    }
}

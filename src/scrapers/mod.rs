//! Job board adapters.
//!
//! Each configured [`SourceDescriptor`] names one of a closed set of board
//! kinds, and [`HttpFetcher`] dispatches on that kind:
//!
//! | Kind | Module | Method | Notes |
//! |------|--------|--------|-------|
//! | Greenhouse | [`greenhouse`] | HTML scraping | `div.opening` listings |
//! | Lever | [`lever`] | HTML scraping | `div.posting` listings, title in `h5` |
//! | Ashby | [`ashby`] | JSON API | POST to the posting API keyed by board slug |
//!
//! Every adapter turns its failures into a [`FetchError`] tagged with the
//! source name and returns no postings; nothing escapes as a panic or aborts
//! the other sources.

pub mod ashby;
pub mod greenhouse;
pub mod lever;

use crate::error::{FetchError, FetchErrorKind};
use crate::models::{Posting, SourceDescriptor, SourceKind};
use crate::utils::truncate_for_log;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Some boards reject requests that do not look like a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Build the shared HTTP client with browser identification headers and a request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

/// Postings from one source, plus the reason there are none when it failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFetch {
    pub postings: Vec<Posting>,
    pub error: Option<FetchError>,
}

impl SourceFetch {
    pub fn ok(postings: Vec<Posting>) -> Self {
        Self {
            postings,
            error: None,
        }
    }

    pub fn failed(error: FetchError) -> Self {
        Self {
            postings: Vec::new(),
            error: Some(error),
        }
    }
}

/// Something that can turn a source descriptor into candidate postings.
///
/// Implementations must not fail past this boundary: errors are reported in
/// [`SourceFetch::error`].
pub trait FetchSource {
    async fn fetch(&self, source: &SourceDescriptor) -> SourceFetch;
}

/// The real network-backed adapter set.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    ashby_api_base: Url,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            ashby_api_base: ashby::default_api_base(),
        })
    }

    /// Point Ashby boards at a different posting API root.
    pub fn with_ashby_api_base(mut self, base: Url) -> Self {
        self.ashby_api_base = base;
        self
    }
}

impl FetchSource for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(source = %source.name, kind = %source.kind))]
    async fn fetch(&self, source: &SourceDescriptor) -> SourceFetch {
        info!("Scanning source");
        let result = match source.kind {
            SourceKind::Greenhouse => greenhouse::fetch(&self.client, source).await,
            SourceKind::Lever => lever::fetch(&self.client, source).await,
            SourceKind::Ashby => ashby::fetch(&self.client, &self.ashby_api_base, source).await,
        };

        match result {
            Ok(postings) => {
                info!(count = postings.len(), "Found postings");
                SourceFetch::ok(postings)
            }
            Err(kind) => SourceFetch::failed(FetchError::new(&source.name, kind)),
        }
    }
}

/// Fail on any non-2xx status before the body is read.
pub(crate) fn check_status(response: Response) -> Result<Response, FetchErrorKind> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchErrorKind::Http(status.as_u16()))
    }
}

/// GET an HTML board page with the client's browser headers.
#[instrument(level = "debug", skip(client))]
pub(crate) async fn get_page(client: &Client, url: &Url) -> Result<String, FetchErrorKind> {
    let response = check_status(client.get(url.clone()).send().await?)?;
    let body = response.text().await?;
    debug!(bytes = body.len(), "Fetched page");
    Ok(body)
}

/// Resolve a listing href against the board URL it was found on.
pub(crate) fn resolve_href(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(String::from)
}

/// Why a page that loaded fine might still have no listings on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDiagnosis {
    /// A bot-challenge or waiting-room page was served instead of the board.
    ChallengePage,
    /// The origin refused the request outright.
    AccessDenied,
    /// Real boards are large; this is likely an error page.
    SuspiciouslyShort,
}

impl fmt::Display for PageDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PageDiagnosis::ChallengePage => "blocked by a bot challenge page",
            PageDiagnosis::AccessDenied => "access denied by the origin",
            PageDiagnosis::SuspiciouslyShort => "suspiciously short page",
        };
        f.write_str(text)
    }
}

const SHORT_PAGE_BYTES: usize = 1000;

/// Classify a page body that looks like a block rather than a board.
pub fn diagnose_page(body: &str) -> Option<PageDiagnosis> {
    if body.contains("Cloudflare") || body.contains("Just a moment") {
        Some(PageDiagnosis::ChallengePage)
    } else if body.contains("Access denied") || body.contains("403 Forbidden") {
        Some(PageDiagnosis::AccessDenied)
    } else if body.len() < SHORT_PAGE_BYTES {
        Some(PageDiagnosis::SuspiciouslyShort)
    } else {
        None
    }
}

/// Log a diagnosis when an HTML board parsed to nothing.
pub(crate) fn warn_if_blocked(body: &str, postings: &[Posting]) {
    if !postings.is_empty() {
        return;
    }
    match diagnose_page(body) {
        Some(diagnosis) => warn!(
            %diagnosis,
            preview = %truncate_for_log(body, 200),
            "Page loaded but yielded no postings"
        ),
        None => debug!("Page loaded but yielded no postings"),
    }
}

/// Fetch a single URL with the browser headers and report what came back.
///
/// Used by `--probe` to debug a board that stopped yielding postings. The URL
/// is requested directly, with the same client a real run uses; it is not
/// routed through a reader proxy such as `r.jina.ai`, so what it shows is
/// exactly what the adapters would see.
#[instrument(level = "info", skip(client))]
pub async fn probe(client: &Client, url: &Url) -> Result<(), FetchErrorKind> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    let body = response.text().await?;
    info!(
        status = status.as_u16(),
        bytes = body.len(),
        preview = %truncate_for_log(&body, 500),
        "Probe response"
    );
    match diagnose_page(&body) {
        Some(diagnosis) => warn!(%diagnosis, "Probe diagnosis"),
        None => info!("Probe diagnosis: page looks like a real board"),
    }
    Ok(())
}

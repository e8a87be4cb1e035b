//! Greenhouse board scraper.
//!
//! Boards live at `https://boards.greenhouse.io/<company>` and list each job as
//! a `div.opening` whose first anchor holds the title and a (usually relative)
//! link such as `/datadog/jobs/123`.

use super::{get_page, resolve_href, warn_if_blocked};
use crate::error::FetchErrorKind;
use crate::models::{Posting, SourceDescriptor};
use crate::utils::clean_text;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;
use url::Url;

static OPENING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.opening").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

#[instrument(level = "info", skip_all, fields(url = %source.url))]
pub async fn fetch(client: &Client, source: &SourceDescriptor) -> Result<Vec<Posting>, FetchErrorKind> {
    let base = source
        .endpoint()
        .map_err(|e| FetchErrorKind::BadEndpoint(e.to_string()))?;
    let body = get_page(client, &base).await?;
    let postings = parse_postings(&body, &base, &source.name);
    warn_if_blocked(&body, &postings);
    Ok(postings)
}

/// Extract postings from a Greenhouse board page.
///
/// Openings without an anchor, an href or title text are skipped.
pub fn parse_postings(html: &str, base: &Url, source_name: &str) -> Vec<Posting> {
    let document = Html::parse_document(html);
    document
        .select(&OPENING)
        .filter_map(|opening| {
            let anchor = opening.select(&LINK).next()?;
            let href = anchor.value().attr("href")?;
            let title = clean_text(&anchor.text().collect::<String>());
            if title.is_empty() {
                return None;
            }
            let url = resolve_href(base, href)?;
            Some(Posting::new(title, url, source_name))
        })
        .collect()
}

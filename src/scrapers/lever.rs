//! Lever board scraper.
//!
//! Boards live at `https://jobs.lever.co/<company>`. Each job is a
//! `div.posting` containing an `a.posting-title` link; the title text sits in
//! an `h5` inside that link, next to location and team labels.

use super::{get_page, resolve_href, warn_if_blocked};
use crate::error::FetchErrorKind;
use crate::models::{Posting, SourceDescriptor};
use crate::utils::clean_text;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;
use url::Url;

static POSTING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.posting").expect("valid selector"));
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.posting-title").expect("valid selector"));
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h5").expect("valid selector"));

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

/// Extract postings from a Lever board page.
///
/// The `h5` text is the title; when a board omits it the whole link text is used.
pub fn parse_postings(html: &str, base: &Url, source_name: &str) -> Vec<Posting> {
    let document = Html::parse_document(html);
    document
        .select(&POSTING)
        .filter_map(|posting| {
            let link = posting.select(&TITLE_LINK).next()?;
            let href = link.value().attr("href")?;
            let raw_title = match link.select(&HEADING).next() {
                Some(heading) => heading.text().collect::<String>(),
                None => link.text().collect::<String>(),
            };
            let title = clean_text(&raw_title);
            if title.is_empty() {
                return None;
            }
            let url = resolve_href(base, href)?;
            Some(Posting::new(title, url, source_name))
        })
        .collect()
}

//! Static HTML job feed.
//!
//! One card per known posting, newest first-seen date at the top. Postings
//! first seen in this run get a "FRESH" badge. All scraped text is escaped
//! before it is interpolated.

use crate::models::{KnownPosting, RunResult};
use crate::utils::write_atomically;
use chrono::{DateTime, TimeZone};
use html_escape::{encode_double_quoted_attribute, encode_text};
use itertools::Itertools;
use std::error::Error;
use std::fmt::{Display, Write};
use std::path::Path;
use tracing::{info, instrument};

const STYLE: &str = r#"
    body { font-family: -apple-system, system-ui, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #f0f2f5; color: #1c1e21; margin: 0; padding: 20px; }
    h1 { font-size: 24px; margin-bottom: 5px; color: #333; }
    .timestamp { font-size: 13px; color: #65676b; margin-bottom: 25px; }
    .card { background: white; border-radius: 12px; padding: 16px; margin-bottom: 12px; box-shadow: 0 1px 2px rgba(0,0,0,0.1); transition: transform 0.2s; }
    .card:active { transform: scale(0.98); }
    .tag { display: inline-block; background: #e7f3ff; color: #1877f2; padding: 4px 8px; border-radius: 6px; font-size: 12px; font-weight: 600; margin-bottom: 8px; }
    .title { font-size: 17px; font-weight: 600; margin-bottom: 6px; display: block; text-decoration: none; color: #050505; line-height: 1.4; }
    .new-badge { background: #e4f7eb; color: #09a244; padding: 4px 8px; border-radius: 6px; font-size: 11px; font-weight: 800; letter-spacing: 0.5px; margin-left: 8px; text-transform: uppercase; }
    .meta { font-size: 13px; color: #65676b; margin-top: 8px; }
    .empty { text-align: center; color: #65676b; margin-top: 60px; font-size: 15px; }
"#;

/// Render the full feed page.
///
/// `updated_at` is shown in the header, e.g. "Updated: March 07, 09:15 PM".
pub fn render_report<Tz>(result: &RunResult, updated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut page = String::new();
    let _ = write!(
        page,
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Bedtime Job Feed</title>
  <style>{STYLE}</style>
</head>
<body>
  <h1>🛏️ Bedtime Job Feed</h1>
  <div class="timestamp">Updated: {}</div>
"#,
        updated_at.format("%B %d, %I:%M %p")
    );

    if result.all_known.is_empty() {
        page.push_str(
            "  <div class=\"empty\">No matching jobs found today. Sleep well. 😴</div>\n",
        );
    }

    // Stable sort keeps URL order within a day.
    let newest_first = result
        .all_known
        .iter()
        .sorted_by(|(_, a), (_, b)| b.date.cmp(&a.date));
    for (url, posting) in newest_first {
        render_card(&mut page, url, posting, result.is_new(url));
    }

    page.push_str("</body>\n</html>\n");
    page
}

fn render_card(page: &mut String, url: &str, posting: &KnownPosting, is_new: bool) {
    let badge = if is_new {
        r#"<span class="new-badge">FRESH</span>"#
    } else {
        ""
    };
    let _ = write!(
        page,
        r#"  <div class="card">
    <div><span class="tag">{company}</span>{badge}</div>
    <a href="{href}" target="_blank" rel="noopener" class="title">{title}</a>
    <div class="meta">Found: {date}</div>
  </div>
"#,
        company = encode_text(&posting.company),
        href = encode_double_quoted_attribute(url),
        title = encode_text(&posting.title),
        date = posting.date.format("%Y-%m-%d"),
    );
}

/// Render and write the feed page to `path`, replacing any previous page.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report<Tz>(
    result: &RunResult,
    updated_at: &DateTime<Tz>,
    path: &Path,
) -> Result<(), Box<dyn Error>>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let page = render_report(result, updated_at);
    write_atomically(path, page.as_bytes()).await?;
    info!(
        bytes = page.len(),
        cards = result.all_known.len(),
        fresh = result.new_postings.len(),
        "Wrote job feed"
    );
    Ok(())
}

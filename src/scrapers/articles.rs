//! Per-link article fetching and parsing.
//!
//! Each candidate link is fetched once, in order. A page yields a [`Record`]
//! holding its `<title>` text and its `og:description` meta content. Failed
//! fetches are logged and skipped; they never abort the batch.

use crate::fetch::PageFetcher;
use crate::models::Record;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());

/// Parse one fetched page into a record for `link`.
///
/// A missing `<title>` gives an empty title; a missing tag or `content`
/// attribute gives an absent description.
pub fn parse_article(link: &str, html: &str) -> Record {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let description = document
        .select(&OG_DESCRIPTION)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim);

    Record::new(title, description, link)
}

/// Fetch and parse every link, keeping encounter order.
///
/// # Returns
///
/// One [`Record`] per link that was fetched successfully.
#[instrument(level = "info", skip_all, fields(links = links.len()))]
pub async fn fetch_articles<F>(fetcher: &F, links: &[String]) -> Vec<Record>
where
    F: PageFetcher + ?Sized,
{
    let results: Vec<Option<Record>> = stream::iter(links)
        .then(|link| async move {
            match fetcher.fetch(link).await {
                Ok(html) => {
                    let record = parse_article(link, &html);
                    debug!(%link, title = %record.title, "Parsed article");
                    Some(record)
                }
                Err(e) => {
                    warn!(%link, error = %e, "Error fetching or parsing link; skipping");
                    None
                }
            }
        })
        .collect()
        .await;

    let failed = results.iter().filter(|r| r.is_none()).count();
    let records: Vec<Record> = results.into_iter().flatten().collect();
    info!(count = records.len(), failed, "Fetched article records");
    records
}

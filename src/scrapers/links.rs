//! Link discovery from seed homepages.
//!
//! Every `a[href]` on a seed page becomes a candidate article URL. Relative
//! hrefs are joined to the seed by plain concatenation (see
//! [`normalize_href`]); no deduplication happens at this stage.

use crate::errors::PipelineError;
use crate::fetch::PageFetcher;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Resolve an href found on `seed` into a candidate URL.
///
/// - hrefs starting with `http` are returned unchanged
/// - otherwise the href is appended to the seed, inserting a `/` only when
///   the seed does not already end with one
pub fn normalize_href(seed: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if seed.ends_with('/') {
        format!("{seed}{href}")
    } else {
        format!("{seed}/{href}")
    }
}

/// Collect raw href values of every anchor in document order.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Fetch each seed in order and return every discovered link.
///
/// # Errors
///
/// The first seed that cannot be fetched aborts discovery with
/// [`PipelineError::SeedFetch`].
#[instrument(level = "info", skip_all, fields(seeds = seeds.len()))]
pub async fn index_links<F>(
    fetcher: &F,
    seeds: &[String],
) -> Result<Vec<String>, PipelineError>
where
    F: PageFetcher + ?Sized,
{
    let mut links = Vec::new();
    for seed in seeds {
        let html = fetcher
            .fetch(seed)
            .await
            .map_err(|source| PipelineError::SeedFetch {
                url: seed.clone(),
                source,
            })?;

        let found: Vec<String> = extract_hrefs(&html)
            .iter()
            .map(|href| normalize_href(seed, href))
            .collect();
        info!(count = found.len(), source = %seed, "Indexed seed links");
        debug!(urls = ?found, "Seed links");
        links.extend(found);
    }

    info!(count = links.len(), "Discovered candidate links");
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::fetch::stub::StubFetcher;

    #[test]
    fn test_normalize_absolute_href_unchanged() {
        assert_eq!(
            normalize_href("https://www.dawn.com/", "https://other.com/a"),
            "https://other.com/a"
        );
        assert_eq!(
            normalize_href("https://www.dawn.com", "http://other.com/a"),
            "http://other.com/a"
        );
    }

    #[test]
    fn test_normalize_relative_href() {
        assert_eq!(
            normalize_href("https://www.dawn.com/", "news/1"),
            "https://www.dawn.com/news/1"
        );
        assert_eq!(
            normalize_href("https://www.bbc.com", "news/1"),
            "https://www.bbc.com/news/1"
        );
        // Plain concatenation: a leading slash is not collapsed.
        assert_eq!(
            normalize_href("https://www.dawn.com/", "/news/1"),
            "https://www.dawn.com//news/1"
        );
    }

    #[test]
    fn test_extract_hrefs_in_document_order() {
        let html = r#"
            <html><body>
              <a href="/one">One</a>
              <a>no href</a>
              <div><a href="https://x.com/two">Two</a></div>
              <a href="/one">Again</a>
            </body></html>"#;
        assert_eq!(extract_hrefs(html), vec!["/one", "https://x.com/two", "/one"]);
    }

    #[tokio::test]
    async fn test_index_links_concatenates_seeds_in_order() {
        let fetcher = StubFetcher::new()
            .page("https://a.test/", r#"<a href="x">x</a><a href="http://z.test/">z</a>"#)
            .page("https://b.test", r#"<a href="y">y</a>"#);
        let seeds = vec!["https://a.test/".to_string(), "https://b.test".to_string()];

        let links = index_links(&fetcher, &seeds).await.unwrap();
        assert_eq!(
            links,
            vec!["https://a.test/x", "http://z.test/", "https://b.test/y"]
        );
    }

    #[tokio::test]
    async fn test_index_links_aborts_on_seed_failure() {
        let fetcher = StubFetcher::new()
            .failing("https://a.test/", 503)
            .page("https://b.test/", r#"<a href="y">y</a>"#);
        let seeds = vec!["https://a.test/".to_string(), "https://b.test/".to_string()];

        let err = index_links(&fetcher, &seeds).await.unwrap_err();
        match err {
            PipelineError::SeedFetch { url, source } => {
                assert_eq!(url, "https://a.test/");
                assert!(matches!(source, FetchError::Status { status: 503, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fetcher.requested(), vec!["https://a.test/"]);
    }
}

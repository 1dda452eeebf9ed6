//! Homepage scrapers for building the raw article dataset.
//!
//! Scraping follows the usual two-phase pattern:
//!
//! 1. **Indexing**: [`links::index_links`] discovers candidate URLs from the
//!    configured seed homepages
//! 2. **Fetching**: [`articles::fetch_articles`] downloads each candidate and
//!    parses its title and `og:description`
//!
//! Both phases fetch sequentially through a [`crate::fetch::PageFetcher`], so
//! output order follows seed order, then anchor order within each seed.
//! Failures differ by phase: a seed failure aborts indexing, an article
//! failure only drops that link.

pub mod articles;
pub mod links;

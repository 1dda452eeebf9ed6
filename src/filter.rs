//! Deduplication and language filtering of raw records.
//!
//! Rules, applied after exact-duplicate removal:
//!
//! | title     | description | outcome                              |
//! |-----------|-------------|--------------------------------------|
//! | non-empty | present     | kept if both are ASCII, else dropped |
//! | empty     | any         | kept, description absent             |
//! | any       | absent      | kept, description absent             |
//!
//! ASCII-only text is used as a cheap stand-in for "English". It rejects some
//! legitimate English (curly quotes, accented names) and never needs a
//! language model.
//!
//! Deduplication runs again after descriptions are cleared, since two records
//! that differed only in description collapse into one.
//!
//! Surviving records currently keep first-occurrence order, but callers must
//! treat the output order as unspecified.

use crate::models::Record;
use crate::utils::truncate_for_log;
use itertools::Itertools;
use tracing::{info, instrument, warn};

/// What happens to a single deduplicated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    KeepWithoutDescription,
    RejectNonAscii,
}

/// Result of [`preprocess`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub records: Vec<Record>,
    pub duplicates: usize,
    pub rejected: usize,
}

/// True when `text` survives an ASCII encode/decode round trip unchanged.
///
/// Encoding to ASCII while dropping unencodable characters and decoding
/// back gives the same string exactly when no character was dropped, so the
/// round trip reduces to every character being ASCII. Curly quotes, accents
/// and non-Latin scripts all fail.
pub fn is_ascii_text(text: &str) -> bool {
    text.is_ascii()
}

/// Decide the fate of one record.
pub fn classify(record: &Record) -> Verdict {
    match record.description.as_deref() {
        Some(description) if !record.title.is_empty() => {
            if is_ascii_text(&record.title) && is_ascii_text(description) {
                Verdict::Keep
            } else {
                Verdict::RejectNonAscii
            }
        }
        _ => Verdict::KeepWithoutDescription,
    }
}

/// Deduplicate `records` by full equality, then apply the language filter.
#[instrument(level = "info", skip_all, fields(input = records.len()))]
pub fn preprocess(records: Vec<Record>) -> FilterOutcome {
    let total = records.len();
    let unique: Vec<Record> = records.into_iter().unique().collect();
    let duplicates = total - unique.len();

    let mut outcome = FilterOutcome {
        duplicates,
        ..Default::default()
    };
    for mut record in unique {
        match classify(&record) {
            Verdict::Keep => outcome.records.push(record),
            Verdict::KeepWithoutDescription => {
                record.description = None;
                outcome.records.push(record);
            }
            Verdict::RejectNonAscii => {
                outcome.rejected += 1;
                warn!(
                    link = %record.link,
                    title = %truncate_for_log(&record.title, 120),
                    "Ignoring non-English entry"
                );
            }
        }
    }

    // Clearing descriptions can make two distinct records equal.
    let before = outcome.records.len();
    outcome.records = outcome.records.into_iter().unique().collect();
    outcome.duplicates += before - outcome.records.len();

    info!(
        kept = outcome.records.len(),
        duplicates = outcome.duplicates,
        rejected = outcome.rejected,
        "Preprocessed records"
    );
    outcome
}

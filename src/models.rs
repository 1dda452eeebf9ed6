//! Data model for extracted articles.
//!
//! A [`Record`] is the unit flowing through every stage of the pipeline. It is
//! serialized with the fixed CSV header `Title,Description,Link`.
//!
//! # Absent descriptions
//!
//! `description` is `None` when a page has no usable description. An empty or
//! whitespace-only description is normalized to `None` on construction, so
//! `Some("")` never exists. On disk `None` is an empty `Description` cell and
//! an empty cell always reloads as `None`.

use serde::{Deserialize, Deserializer, Serialize};

/// One extracted article.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Document title, trimmed. May be empty.
    #[serde(rename = "Title")]
    pub title: String,
    /// `og:description` content, trimmed, or `None` when absent.
    #[serde(rename = "Description", deserialize_with = "absent_if_empty")]
    pub description: Option<String>,
    /// The fetched URL.
    #[serde(rename = "Link")]
    pub link: String,
}

impl Record {
    pub fn new(
        title: impl Into<String>,
        description: Option<impl Into<String>>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.map(Into::<String>::into).filter(|d| !d.trim().is_empty()),
            link: link.into(),
        }
    }
}

fn absent_if_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

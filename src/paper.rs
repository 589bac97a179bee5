//! Canonical paper entity and raw-record normalization.
//!
//! The feed decoder produces loosely-populated [`RawEntry`](crate::feed::RawEntry)
//! records; this module validates them once, at the normalization boundary,
//! and turns them into immutable [`Paper`] values. Entries lacking a required
//! field are dropped silently: feeds routinely contain records the consumer
//! cannot use, and that is not an error.

use crate::feed::RawEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Base URL for a paper's abstract page
pub const ABS_URL_BASE: &str = "https://arxiv.org/abs";

/// Base URL for a paper's PDF rendition
pub const PDF_URL_BASE: &str = "https://arxiv.org/pdf";

/// A single paper from the listing service.
///
/// Immutable once constructed. `id` is the canonical remote identifier (the
/// last path segment of the entry's id URL, e.g. `2401.12345v1`) and is
/// guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    /// Abstract text
    pub summary: String,
    /// Author names, feed order preserved
    pub authors: Vec<String>,
    /// Subject tags
    pub categories: Vec<String>,
    pub published: DateTime<Utc>,
    /// Abstract page URL; synthesized from `id` when the feed gave none
    pub link: String,
}

impl Paper {
    /// Normalize a raw feed record into a `Paper`.
    ///
    /// Required fields: `id`, `title`, `summary`, and a `published` value in
    /// RFC 3339 form. Returns `None` when any of them is missing or
    /// unparseable.
    pub fn from_raw(raw: RawEntry) -> Option<Paper> {
        let id = raw
            .id
            .as_deref()
            .and_then(|id_url| id_url.rsplit('/').next())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)?;

        let title = raw.title?;
        let summary = raw.summary?;
        let published = DateTime::parse_from_rfc3339(raw.published?.as_str())
            .ok()?
            .with_timezone(&Utc);

        // Use the feed's link when it is a valid URL, otherwise fall back to
        // the canonical abstract page derived from the id.
        let link = raw
            .link
            .filter(|href| Url::parse(href).is_ok())
            .unwrap_or_else(|| abs_url(&id));

        Some(Paper {
            id,
            title,
            summary,
            authors: raw.authors,
            categories: raw.categories,
            published,
            link,
        })
    }

    /// Canonical PDF URL for this paper.
    pub fn pdf_url(&self) -> String {
        format!("{}/{}.pdf", PDF_URL_BASE, self.id)
    }
}

/// Canonical abstract page URL for a paper id.
pub fn abs_url(id: &str) -> String {
    format!("{}/{}", ABS_URL_BASE, id.trim())
}

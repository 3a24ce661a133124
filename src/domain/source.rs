//! Candidate documents parsed from the manifest.

use serde::{Deserialize, Serialize};

use super::record::{ContentType, ContributorStat, RecordFields};

/// A normalized candidate, produced per manifest entry and discarded after diffing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Manifest identifier; the record key
    pub filename: String,

    pub title: String,
    pub content_type: ContentType,
    pub tags: Vec<String>,

    /// Absent optional fields are `None`, never empty strings
    pub image: Option<String>,
    pub image_text: Option<String>,
    pub url: Option<String>,
    pub body_content: Option<String>,
}

/// Authorship derived from version-control history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub contributors: Vec<ContributorStat>,
    pub author_name: String,
    pub author_email: String,
    pub author_avatar: String,
}

impl SourceDocument {
    /// Project the candidate into the full set of tracked fields.
    ///
    /// `strip` turns body markdown into plain text; it only runs when a body
    /// is present, so `stripped_content` is `None` exactly when
    /// `body_content` is.
    pub fn into_fields<F>(self, enrichment: Enrichment, strip: F) -> RecordFields
    where
        F: Fn(&str) -> String,
    {
        let stripped_content = self.body_content.as_deref().map(strip);

        RecordFields {
            title: self.title,
            content_type: self.content_type,
            tags: self.tags,
            image: self.image,
            image_text: self.image_text,
            url: self.url,
            body_content: self.body_content,
            stripped_content,
            author_name: enrichment.author_name,
            author_email: enrichment.author_email,
            author_avatar: enrichment.author_avatar,
            contributors: enrichment.contributors,
        }
    }
}

/// Map empty or whitespace-only strings to `None`
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

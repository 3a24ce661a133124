//! Stored content records and field-level equality.
//!
//! A record's tracked fields are enumerated explicitly in [`TrackedField`];
//! the reconciler compares a candidate against the stored record one field at
//! a time, never by walking whatever keys happen to be present.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of content an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Multi,
    Graphic,
    Link,
    Video,
    Podcast,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Multi,
        ContentType::Graphic,
        ContentType::Link,
        ContentType::Video,
        ContentType::Podcast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Multi => "multi",
            ContentType::Graphic => "graphic",
            ContentType::Link => "link",
            ContentType::Video => "video",
            ContentType::Podcast => "podcast",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let wanted = s.trim().to_lowercase();
        ContentType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown content type: {}", s))
    }
}

/// One contributor's share of a content file's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStat {
    pub name: String,

    /// Lowercased; the contributor's identity
    pub email: String,

    pub contributions: u64,

    pub avatar: String,
}

/// The tracked (diffable) fields of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    pub title: String,
    pub content_type: ContentType,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub image_text: Option<String>,
    pub url: Option<String>,
    pub body_content: Option<String>,

    /// Plain-text projection of `body_content`; `None` exactly when it is `None`
    pub stripped_content: Option<String>,

    pub author_name: String,
    pub author_email: String,
    pub author_avatar: String,

    /// Full snapshot, replaced wholesale on every update
    pub contributors: Vec<ContributorStat>,
}

/// A durable record, keyed by `filename`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub filename: String,

    #[serde(flatten)]
    pub fields: RecordFields,

    /// Storage metadata, ignored by equality
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revision: u64,
}

/// Every field the reconciler compares and overwrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    Title,
    ContentType,
    Tags,
    Image,
    ImageText,
    Url,
    BodyContent,
    StrippedContent,
    AuthorName,
    AuthorEmail,
    AuthorAvatar,
    Contributors,
}

impl TrackedField {
    pub const ALL: [TrackedField; 12] = [
        TrackedField::Title,
        TrackedField::ContentType,
        TrackedField::Tags,
        TrackedField::Image,
        TrackedField::ImageText,
        TrackedField::Url,
        TrackedField::BodyContent,
        TrackedField::StrippedContent,
        TrackedField::AuthorName,
        TrackedField::AuthorEmail,
        TrackedField::AuthorAvatar,
        TrackedField::Contributors,
    ];

    /// Column / document key for this field
    pub fn name(&self) -> &'static str {
        match self {
            TrackedField::Title => "title",
            TrackedField::ContentType => "contentType",
            TrackedField::Tags => "tags",
            TrackedField::Image => "image",
            TrackedField::ImageText => "imageText",
            TrackedField::Url => "url",
            TrackedField::BodyContent => "bodyContent",
            TrackedField::StrippedContent => "strippedContent",
            TrackedField::AuthorName => "authorName",
            TrackedField::AuthorEmail => "authorEmail",
            TrackedField::AuthorAvatar => "authorAvatar",
            TrackedField::Contributors => "contributors",
        }
    }

    /// Whether `a` and `b` agree on this field
    pub fn matches(&self, a: &RecordFields, b: &RecordFields) -> bool {
        match self {
            TrackedField::Title => a.title == b.title,
            TrackedField::ContentType => a.content_type == b.content_type,
            TrackedField::Tags => tag_set(&a.tags) == tag_set(&b.tags),
            TrackedField::Image => a.image == b.image,
            TrackedField::ImageText => a.image_text == b.image_text,
            TrackedField::Url => a.url == b.url,
            TrackedField::BodyContent => a.body_content == b.body_content,
            TrackedField::StrippedContent => a.stripped_content == b.stripped_content,
            TrackedField::AuthorName => a.author_name == b.author_name,
            TrackedField::AuthorEmail => a.author_email == b.author_email,
            TrackedField::AuthorAvatar => a.author_avatar == b.author_avatar,
            TrackedField::Contributors => contributors_match(&a.contributors, &b.contributors),
        }
    }
}

impl std::fmt::Display for TrackedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl RecordFields {
    /// Tracked fields on which `self` and `other` disagree, in declaration order
    pub fn changed_fields(&self, other: &RecordFields) -> Vec<TrackedField> {
        TrackedField::ALL
            .into_iter()
            .filter(|field| !field.matches(self, other))
            .collect()
    }
}

fn tag_set(tags: &[String]) -> BTreeSet<&str> {
    tags.iter().map(String::as_str).collect()
}

/// Element-wise comparison on the semantic sub-fields only
fn contributors_match(a: &[ContributorStat], b: &[ContributorStat]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.name == y.name
                && x.email.eq_ignore_ascii_case(&y.email)
                && x.contributions == y.contributions
                && x.avatar == y.avatar
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> RecordFields {
        RecordFields {
            title: "Intro".to_string(),
            content_type: ContentType::Link,
            tags: vec!["a".to_string(), "b".to_string()],
            image: None,
            image_text: None,
            url: Some("http://x".to_string()),
            body_content: None,
            stripped_content: None,
            author_name: "Ava Lee".to_string(),
            author_email: "ava@x.com".to_string(),
            author_avatar: "https://avatars.example/ava".to_string(),
            contributors: vec![ContributorStat {
                name: "Ava Lee".to_string(),
                email: "ava@x.com".to_string(),
                contributions: 3,
                avatar: "https://avatars.example/ava".to_string(),
            }],
        }
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("link".parse::<ContentType>().unwrap(), ContentType::Link);
        assert_eq!("Podcast".parse::<ContentType>().unwrap(), ContentType::Podcast);
        assert!("youtube".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_identical_fields_have_no_changes() {
        let a = sample_fields();
        assert!(a.changed_fields(&a.clone()).is_empty());
    }

    #[test]
    fn test_tag_order_is_insignificant() {
        let a = sample_fields();
        let mut b = a.clone();
        b.tags = vec!["b".to_string(), "a".to_string()];
        assert!(a.changed_fields(&b).is_empty());

        b.tags.push("c".to_string());
        assert_eq!(a.changed_fields(&b), vec![TrackedField::Tags]);
    }

    #[test]
    fn test_absent_optional_differs_from_present() {
        let a = sample_fields();
        let mut b = a.clone();
        b.image_text = Some("alt".to_string());
        assert_eq!(a.changed_fields(&b), vec![TrackedField::ImageText]);
    }

    #[test]
    fn test_contributor_changes_detected() {
        let a = sample_fields();
        let mut b = a.clone();
        b.contributors[0].contributions = 4;
        assert_eq!(a.changed_fields(&b), vec![TrackedField::Contributors]);

        let mut c = a.clone();
        c.contributors.clear();
        assert_eq!(a.changed_fields(&c), vec![TrackedField::Contributors]);
    }

    #[test]
    fn test_record_serializes_flat_camel_case() {
        let record = ContentRecord {
            filename: "post1.md".to_string(),
            fields: sample_fields(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            revision: 0,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["filename"], "post1.md");
        assert_eq!(json["contentType"], "link");
        assert_eq!(json["strippedContent"], serde_json::Value::Null);
        assert_eq!(json["contributors"][0]["contributions"], 3);
    }
}

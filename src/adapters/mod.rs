//! Adapter interfaces for external systems.
//!
//! Adapters provide a uniform interface over the collaborators the sync
//! engine depends on: version-control history, identity lookup and the
//! search index.

pub mod algolia;
pub mod git;
pub mod github;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ContentRecord;
use crate::error::HistoryError;

pub use algolia::AlgoliaIndex;
pub use git::GitHistory;
pub use github::{DisabledLookup, GithubLookup};

/// Version-control history for a single source path
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Contribution summary lines (`<count>\t<name> <<email>>`), first to
    /// most recent commit inclusive
    async fn full_history(&self, path: &Path) -> Result<Vec<String>, HistoryError>;

    /// Author line (`<name> <<email>>`) of the commit that introduced the path
    async fn first_introducing_commit(&self, path: &Path) -> Result<Option<String>, HistoryError>;
}

/// External identity lookup used for avatars
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    fn name(&self) -> &str;

    /// Avatar URL of the first identity matching `email`, if any
    async fn search_by_email(&self, email: &str) -> Result<Option<String>>;
}

/// One search-index document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub filename: String,
    pub title: String,
    pub tags: Vec<String>,
    pub content_type: String,
    pub stripped_content: Option<String>,
    pub image_text: Option<String>,
}

impl IndexEntry {
    pub fn from_record(record: &ContentRecord) -> Self {
        Self {
            object_id: record.filename.clone(),
            filename: record.filename.clone(),
            title: record.fields.title.clone(),
            tags: record.fields.tags.clone(),
            content_type: record.fields.content_type.to_string(),
            stripped_content: record.fields.stripped_content.clone(),
            image_text: record.fields.image_text.clone(),
        }
    }
}

/// Full-text search index
#[async_trait]
pub trait SearchIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Insert or replace entries by object id
    async fn bulk_upsert(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Remove entries by object id
    async fn delete(&self, object_ids: &[String]) -> Result<()>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;
}

//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use content_sync::adapters::{HistorySource, IdentityLookup, IndexEntry, SearchIndex};
use content_sync::core::{AvatarResolver, Coordinator, Enricher, RunOptions};
use content_sync::domain::{ContentRecord, RecordFields};
use content_sync::error::{HistoryError, StoreError};
use content_sync::library::{ContentStore, FieldValue, ListWrites, ManifestLoader, SqliteStore};

/// History keyed by file name
#[derive(Default)]
pub struct FakeHistory {
    entries: Mutex<HashMap<String, (Vec<String>, Option<String>)>>,
}

impl FakeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, filename: &str, shortlog: &[&str], author: Option<&str>) {
        self.entries.lock().unwrap().insert(
            filename.to_string(),
            (
                shortlog.iter().map(|s| s.to_string()).collect(),
                author.map(str::to_string),
            ),
        );
    }

    /// One contributor who is also the author
    pub fn set_single(&self, filename: &str, name: &str, email: &str) {
        let line = format!("1\t{} <{}>", name, email);
        let author = format!("{} <{}>", name, email);
        self.set(filename, &[&line], Some(&author));
    }

    fn lookup(&self, path: &Path) -> (Vec<String>, Option<String>) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.entries
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl HistorySource for FakeHistory {
    async fn full_history(&self, path: &Path) -> Result<Vec<String>, HistoryError> {
        Ok(self.lookup(path).0)
    }

    async fn first_introducing_commit(&self, path: &Path) -> Result<Option<String>, HistoryError> {
        Ok(self.lookup(path).1)
    }
}

/// Identity lookup with canned answers; unknown emails fail
#[derive(Default)]
pub struct FakeLookup {
    avatars: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_avatar(mut self, email: &str, url: &str) -> Self {
        self.avatars.insert(email.to_string(), url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityLookup for FakeLookup {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search_by_email(&self, email: &str) -> Result<Option<String>> {
        self.calls.lock().unwrap().push(email.to_string());
        match self.avatars.get(email) {
            Some(url) => Ok(Some(url.clone())),
            None => anyhow::bail!("rate limited"),
        }
    }
}

/// Records every index call
#[derive(Default)]
pub struct RecordingIndex {
    pub upserts: Mutex<Vec<Vec<IndexEntry>>>,
    pub deletes: Mutex<Vec<Vec<String>>>,
    pub clears: Mutex<usize>,
    pub fail: bool,
}

impl RecordingIndex {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn upserted_ids(&self) -> Vec<String> {
        self.upserts
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|e| e.object_id.clone())
            .collect()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deletes.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl SearchIndex for RecordingIndex {
    fn name(&self) -> &str {
        "recording"
    }

    async fn bulk_upsert(&self, entries: &[IndexEntry]) -> Result<()> {
        if self.fail {
            anyhow::bail!("index unavailable");
        }
        self.upserts.lock().unwrap().push(entries.to_vec());
        Ok(())
    }

    async fn delete(&self, object_ids: &[String]) -> Result<()> {
        if self.fail {
            anyhow::bail!("index unavailable");
        }
        self.deletes.lock().unwrap().push(object_ids.to_vec());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.fail {
            anyhow::bail!("index unavailable");
        }
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }
}

/// In-memory store whose contributor writes append unless the list is empty
#[derive(Default)]
pub struct MergingStore {
    records: Mutex<BTreeMap<String, ContentRecord>>,
    pub writes: Mutex<Vec<Vec<FieldValue>>>,
}

impl MergingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, filename: &str, fields: RecordFields) {
        let now = Utc::now();
        self.records.lock().unwrap().insert(
            filename.to_string(),
            ContentRecord {
                filename: filename.to_string(),
                fields,
                created_at: now,
                updated_at: now,
                revision: 0,
            },
        );
    }

    pub fn get(&self, filename: &str) -> Option<ContentRecord> {
        self.records.lock().unwrap().get(filename).cloned()
    }
}

#[async_trait]
impl ContentStore for MergingStore {
    fn list_writes(&self) -> ListWrites {
        ListWrites::Merge
    }

    async fn find_by_key(&self, filename: &str) -> Result<Option<ContentRecord>, StoreError> {
        Ok(self.get(filename))
    }

    async fn create(&self, filename: &str, fields: &RecordFields) -> Result<(), StoreError> {
        self.insert(filename, fields.clone());
        Ok(())
    }

    async fn replace_fields(&self, filename: &str, values: &[FieldValue]) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push(values.to_vec());

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(filename)
            .ok_or_else(|| StoreError::NotFound(filename.to_string()))?;

        for value in values {
            match value {
                FieldValue::Contributors(incoming) if !incoming.is_empty() => {
                    for contributor in incoming {
                        if !record.fields.contributors.contains(contributor) {
                            record.fields.contributors.push(contributor.clone());
                        }
                    }
                }
                other => other.apply_to(&mut record.fields),
            }
        }
        record.revision += 1;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_where_key_not_in(&self, keys: &[String]) -> Result<Vec<String>, StoreError> {
        let mut records = self.records.lock().unwrap();
        let orphans: Vec<String> = records
            .keys()
            .filter(|k| !keys.contains(k))
            .cloned()
            .collect();
        for key in &orphans {
            records.remove(key);
        }
        Ok(orphans)
    }

    async fn list_all(&self) -> Result<Vec<ContentRecord>, StoreError> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }
}

/// SQLite store whose orphan sweep always fails
pub struct SweepFailingStore {
    pub inner: SqliteStore,
}

impl SweepFailingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
        }
    }
}

#[async_trait]
impl ContentStore for SweepFailingStore {
    fn list_writes(&self) -> ListWrites {
        self.inner.list_writes()
    }

    async fn find_by_key(&self, filename: &str) -> Result<Option<ContentRecord>, StoreError> {
        self.inner.find_by_key(filename).await
    }

    async fn create(&self, filename: &str, fields: &RecordFields) -> Result<(), StoreError> {
        self.inner.create(filename, fields).await
    }

    async fn replace_fields(&self, filename: &str, values: &[FieldValue]) -> Result<(), StoreError> {
        self.inner.replace_fields(filename, values).await
    }

    async fn delete_where_key_not_in(&self, _keys: &[String]) -> Result<Vec<String>, StoreError> {
        Err(StoreError::NotFound("items".to_string()))
    }

    async fn list_all(&self) -> Result<Vec<ContentRecord>, StoreError> {
        self.inner.list_all().await
    }
}

/// A metadata directory in a temp dir
pub struct Site {
    pub temp: TempDir,
}

impl Site {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn write(&self, filename: &str, content: &str) {
        std::fs::write(self.dir().join(filename), content).unwrap();
    }

    pub fn remove(&self, filename: &str) {
        std::fs::remove_file(self.dir().join(filename)).unwrap();
    }
}

/// Front-matter document with the given title, type and tags
pub fn document(title: &str, content_type: &str, tags: &[&str]) -> String {
    let tags = tags
        .iter()
        .map(|t| format!("  - {}", t))
        .collect::<Vec<_>>()
        .join("\n");
    if tags.is_empty() {
        format!("---\ntitle: {}\ncontent_type: {}\n---\n", title, content_type)
    } else {
        format!(
            "---\ntitle: {}\ncontent_type: {}\ntags:\n{}\n---\n",
            title, content_type, tags
        )
    }
}

pub fn coordinator(
    site: &Site,
    store: Arc<dyn ContentStore>,
    history: Arc<FakeHistory>,
    lookup: Arc<FakeLookup>,
    options: RunOptions,
) -> Coordinator {
    let enricher = Enricher::new(history, AvatarResolver::new(lookup));
    Coordinator::new(ManifestLoader::new(site.dir()), store, enricher).with_options(options)
}

//! Persistent record store.
//!
//! [`ContentStore`] is the boundary the reconciler talks to; [`SqliteStore`]
//! is the shipped implementation. Tags and contributors live in JSON columns,
//! so a field write always replaces the whole list.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension, Row};

use crate::domain::{ContentRecord, ContentType, ContributorStat, RecordFields, TrackedField};
use crate::error::StoreError;

/// How a store applies a write to a list-typed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListWrites {
    /// The written list replaces the stored one
    Replace,

    /// Written elements are merged into the stored list; callers must clear
    /// the field in a separate write before writing the new list
    Merge,
}

/// A single tracked field with its new value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Title(String),
    ContentType(ContentType),
    Tags(Vec<String>),
    Image(Option<String>),
    ImageText(Option<String>),
    Url(Option<String>),
    BodyContent(Option<String>),
    StrippedContent(Option<String>),
    AuthorName(String),
    AuthorEmail(String),
    AuthorAvatar(String),
    Contributors(Vec<ContributorStat>),
}

impl FieldValue {
    pub fn field(&self) -> TrackedField {
        match self {
            FieldValue::Title(_) => TrackedField::Title,
            FieldValue::ContentType(_) => TrackedField::ContentType,
            FieldValue::Tags(_) => TrackedField::Tags,
            FieldValue::Image(_) => TrackedField::Image,
            FieldValue::ImageText(_) => TrackedField::ImageText,
            FieldValue::Url(_) => TrackedField::Url,
            FieldValue::BodyContent(_) => TrackedField::BodyContent,
            FieldValue::StrippedContent(_) => TrackedField::StrippedContent,
            FieldValue::AuthorName(_) => TrackedField::AuthorName,
            FieldValue::AuthorEmail(_) => TrackedField::AuthorEmail,
            FieldValue::AuthorAvatar(_) => TrackedField::AuthorAvatar,
            FieldValue::Contributors(_) => TrackedField::Contributors,
        }
    }

    /// Every tracked field of `fields`, for a full overwrite
    pub fn all_of(fields: &RecordFields) -> Vec<FieldValue> {
        vec![
            FieldValue::Title(fields.title.clone()),
            FieldValue::ContentType(fields.content_type),
            FieldValue::Tags(fields.tags.clone()),
            FieldValue::Image(fields.image.clone()),
            FieldValue::ImageText(fields.image_text.clone()),
            FieldValue::Url(fields.url.clone()),
            FieldValue::BodyContent(fields.body_content.clone()),
            FieldValue::StrippedContent(fields.stripped_content.clone()),
            FieldValue::AuthorName(fields.author_name.clone()),
            FieldValue::AuthorEmail(fields.author_email.clone()),
            FieldValue::AuthorAvatar(fields.author_avatar.clone()),
            FieldValue::Contributors(fields.contributors.clone()),
        ]
    }

    /// Apply this value to an in-memory record with replace semantics
    pub fn apply_to(&self, fields: &mut RecordFields) {
        match self {
            FieldValue::Title(v) => fields.title = v.clone(),
            FieldValue::ContentType(v) => fields.content_type = *v,
            FieldValue::Tags(v) => fields.tags = v.clone(),
            FieldValue::Image(v) => fields.image = v.clone(),
            FieldValue::ImageText(v) => fields.image_text = v.clone(),
            FieldValue::Url(v) => fields.url = v.clone(),
            FieldValue::BodyContent(v) => fields.body_content = v.clone(),
            FieldValue::StrippedContent(v) => fields.stripped_content = v.clone(),
            FieldValue::AuthorName(v) => fields.author_name = v.clone(),
            FieldValue::AuthorEmail(v) => fields.author_email = v.clone(),
            FieldValue::AuthorAvatar(v) => fields.author_avatar = v.clone(),
            FieldValue::Contributors(v) => fields.contributors = v.clone(),
        }
    }

    fn column(&self) -> &'static str {
        match self.field() {
            TrackedField::Title => "title",
            TrackedField::ContentType => "content_type",
            TrackedField::Tags => "tags",
            TrackedField::Image => "image",
            TrackedField::ImageText => "image_text",
            TrackedField::Url => "url",
            TrackedField::BodyContent => "body_content",
            TrackedField::StrippedContent => "stripped_content",
            TrackedField::AuthorName => "author_name",
            TrackedField::AuthorEmail => "author_email",
            TrackedField::AuthorAvatar => "author_avatar",
            TrackedField::Contributors => "contributors",
        }
    }

    fn to_sql(&self) -> Result<SqlValue, StoreError> {
        let text = |v: &Option<String>| v.clone().map(SqlValue::Text).unwrap_or(SqlValue::Null);

        Ok(match self {
            FieldValue::Title(v)
            | FieldValue::AuthorName(v)
            | FieldValue::AuthorEmail(v)
            | FieldValue::AuthorAvatar(v) => SqlValue::Text(v.clone()),
            FieldValue::ContentType(v) => SqlValue::Text(v.as_str().to_string()),
            FieldValue::Tags(v) => SqlValue::Text(serde_json::to_string(v)?),
            FieldValue::Contributors(v) => SqlValue::Text(serde_json::to_string(v)?),
            FieldValue::Image(v)
            | FieldValue::ImageText(v)
            | FieldValue::Url(v)
            | FieldValue::BodyContent(v)
            | FieldValue::StrippedContent(v) => text(v),
        })
    }
}

/// Persistent store of content records keyed by filename
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// How list-typed field writes behave
    fn list_writes(&self) -> ListWrites;

    async fn find_by_key(&self, filename: &str) -> Result<Option<ContentRecord>, StoreError>;

    async fn create(&self, filename: &str, fields: &RecordFields) -> Result<(), StoreError>;

    /// Overwrite the named fields of an existing record
    async fn replace_fields(&self, filename: &str, values: &[FieldValue]) -> Result<(), StoreError>;

    /// Delete every record whose key is not in `keys`; returns the deleted keys
    async fn delete_where_key_not_in(&self, keys: &[String]) -> Result<Vec<String>, StoreError>;

    /// All records, ordered by key
    async fn list_all(&self) -> Result<Vec<ContentRecord>, StoreError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS items (
    filename          TEXT PRIMARY KEY NOT NULL,
    title             TEXT NOT NULL,
    content_type      TEXT NOT NULL,
    tags              TEXT NOT NULL DEFAULT '[]',
    image             TEXT,
    image_text        TEXT,
    url               TEXT,
    body_content      TEXT,
    stripped_content  TEXT,
    author_name       TEXT NOT NULL,
    author_email      TEXT NOT NULL,
    author_avatar     TEXT NOT NULL,
    contributors      TEXT NOT NULL DEFAULT '[]',
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    revision          INTEGER NOT NULL DEFAULT 0
);
";

const SELECT_COLUMNS: &str = "filename, title, content_type, tags, image, image_text, url, \
     body_content, stripped_content, author_name, author_email, author_avatar, contributors, \
     created_at, updated_at, revision";

/// SQLite-backed store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Corrupt {
                    filename: path.display().to_string(),
                    reason: format!("cannot create parent directory: {}", e),
                })?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock still guards a consistent connection
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_timestamp(filename: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            filename: filename.to_string(),
            reason: format!("bad timestamp {:?}: {}", raw, e),
        })
}

/// Raw column values of one row, decoded outside the rusqlite callback
struct RawRow {
    filename: String,
    title: String,
    content_type: String,
    tags: String,
    image: Option<String>,
    image_text: Option<String>,
    url: Option<String>,
    body_content: Option<String>,
    stripped_content: Option<String>,
    author_name: String,
    author_email: String,
    author_avatar: String,
    contributors: String,
    created_at: String,
    updated_at: String,
    revision: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            filename: row.get(0)?,
            title: row.get(1)?,
            content_type: row.get(2)?,
            tags: row.get(3)?,
            image: row.get(4)?,
            image_text: row.get(5)?,
            url: row.get(6)?,
            body_content: row.get(7)?,
            stripped_content: row.get(8)?,
            author_name: row.get(9)?,
            author_email: row.get(10)?,
            author_avatar: row.get(11)?,
            contributors: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
            revision: row.get(15)?,
        })
    }

    fn into_record(self) -> Result<ContentRecord, StoreError> {
        let content_type = self
            .content_type
            .parse::<ContentType>()
            .map_err(|e| StoreError::Corrupt {
                filename: self.filename.clone(),
                reason: e.to_string(),
            })?;

        Ok(ContentRecord {
            created_at: parse_timestamp(&self.filename, &self.created_at)?,
            updated_at: parse_timestamp(&self.filename, &self.updated_at)?,
            revision: self.revision.max(0) as u64,
            fields: RecordFields {
                title: self.title,
                content_type,
                tags: serde_json::from_str(&self.tags)?,
                image: self.image,
                image_text: self.image_text,
                url: self.url,
                body_content: self.body_content,
                stripped_content: self.stripped_content,
                author_name: self.author_name,
                author_email: self.author_email,
                author_avatar: self.author_avatar,
                contributors: serde_json::from_str(&self.contributors)?,
            },
            filename: self.filename,
        })
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    fn list_writes(&self) -> ListWrites {
        ListWrites::Replace
    }

    async fn find_by_key(&self, filename: &str) -> Result<Option<ContentRecord>, StoreError> {
        let raw = {
            let conn = self.conn();
            conn.query_row(
                &format!("SELECT {} FROM items WHERE filename = ?1", SELECT_COLUMNS),
                params![filename],
                RawRow::from_row,
            )
            .optional()?
        };

        raw.map(RawRow::into_record).transpose()
    }

    async fn create(&self, filename: &str, fields: &RecordFields) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let tags = serde_json::to_string(&fields.tags)?;
        let contributors = serde_json::to_string(&fields.contributors)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO items (filename, title, content_type, tags, image, image_text, url, \
             body_content, stripped_content, author_name, author_email, author_avatar, \
             contributors, created_at, updated_at, revision) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14, 0)",
            params![
                filename,
                fields.title,
                fields.content_type.as_str(),
                tags,
                fields.image,
                fields.image_text,
                fields.url,
                fields.body_content,
                fields.stripped_content,
                fields.author_name,
                fields.author_email,
                fields.author_avatar,
                contributors,
                now,
            ],
        )?;

        Ok(())
    }

    async fn replace_fields(&self, filename: &str, values: &[FieldValue]) -> Result<(), StoreError> {
        if values.is_empty() {
            return Ok(());
        }

        let mut assignments = Vec::with_capacity(values.len() + 2);
        let mut sql_values = Vec::with_capacity(values.len() + 2);

        for value in values {
            sql_values.push(value.to_sql()?);
            assignments.push(format!("{} = ?{}", value.column(), sql_values.len()));
        }

        sql_values.push(SqlValue::Text(Utc::now().to_rfc3339()));
        assignments.push(format!("updated_at = ?{}", sql_values.len()));
        assignments.push("revision = revision + 1".to_string());

        sql_values.push(SqlValue::Text(filename.to_string()));
        let sql = format!(
            "UPDATE items SET {} WHERE filename = ?{}",
            assignments.join(", "),
            sql_values.len()
        );

        let conn = self.conn();
        let changed = conn.execute(&sql, params_from_iter(sql_values))?;
        if changed == 0 {
            return Err(StoreError::NotFound(filename.to_string()));
        }

        Ok(())
    }

    async fn delete_where_key_not_in(&self, keys: &[String]) -> Result<Vec<String>, StoreError> {
        let keep: HashSet<&str> = keys.iter().map(String::as_str).collect();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let orphans: Vec<String> = {
            let mut stmt = tx.prepare("SELECT filename FROM items ORDER BY filename")?;
            let all = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            all.into_iter().filter(|k| !keep.contains(k.as_str())).collect()
        };

        for orphan in &orphans {
            tx.execute("DELETE FROM items WHERE filename = ?1", params![orphan])?;
        }
        tx.commit()?;

        Ok(orphans)
    }

    async fn list_all(&self) -> Result<Vec<ContentRecord>, StoreError> {
        let raws = {
            let conn = self.conn();
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM items ORDER BY filename",
                SELECT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], RawRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        raws.into_iter().map(RawRow::into_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str) -> RecordFields {
        RecordFields {
            title: title.to_string(),
            content_type: ContentType::Video,
            tags: vec!["b".to_string(), "a".to_string()],
            image: Some("cover.png".to_string()),
            image_text: None,
            url: None,
            body_content: Some("**hi**".to_string()),
            stripped_content: Some("hi".to_string()),
            author_name: "Ava Lee".to_string(),
            author_email: "ava@x.com".to_string(),
            author_avatar: "https://avatars.example/ava".to_string(),
            contributors: vec![ContributorStat {
                name: "Ava Lee".to_string(),
                email: "ava@x.com".to_string(),
                contributions: 2,
                avatar: "https://avatars.example/ava".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create("a.md", &fields("A")).await.unwrap();

        let record = store.find_by_key("a.md").await.unwrap().unwrap();
        assert_eq!(record.filename, "a.md");
        assert_eq!(record.fields, fields("A"));
        assert_eq!(record.revision, 0);

        assert!(store.find_by_key("missing.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create("a.md", &fields("A")).await.unwrap();
        assert!(store.create("a.md", &fields("B")).await.is_err());
    }

    #[tokio::test]
    async fn test_replace_fields_overwrites_lists() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create("a.md", &fields("A")).await.unwrap();

        let replacement = vec![ContributorStat {
            name: "Bo".to_string(),
            email: "bo@x.com".to_string(),
            contributions: 1,
            avatar: "https://avatars.example/bo".to_string(),
        }];
        store
            .replace_fields(
                "a.md",
                &[
                    FieldValue::Title("A2".to_string()),
                    FieldValue::Image(None),
                    FieldValue::Contributors(replacement.clone()),
                ],
            )
            .await
            .unwrap();

        let record = store.find_by_key("a.md").await.unwrap().unwrap();
        assert_eq!(record.fields.title, "A2");
        assert_eq!(record.fields.image, None);
        assert_eq!(record.fields.contributors, replacement);
        assert_eq!(record.revision, 1);
        assert_eq!(store.list_writes(), ListWrites::Replace);
    }

    #[tokio::test]
    async fn test_replace_fields_on_missing_record() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .replace_fields("nope.md", &[FieldValue::Title("x".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_where_key_not_in() {
        let store = SqliteStore::open_in_memory().unwrap();
        for key in ["a.md", "b.md", "c.md"] {
            store.create(key, &fields(key)).await.unwrap();
        }

        let deleted = store
            .delete_where_key_not_in(&["b.md".to_string(), "z.md".to_string()])
            .await
            .unwrap();

        assert_eq!(deleted, vec!["a.md".to_string(), "c.md".to_string()]);
        let keys: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(keys, vec!["b.md".to_string()]);
    }

    #[test]
    fn test_field_value_apply_replaces() {
        let mut f = fields("A");
        FieldValue::Contributors(Vec::new()).apply_to(&mut f);
        FieldValue::Url(Some("http://x".to_string())).apply_to(&mut f);
        assert!(f.contributors.is_empty());
        assert_eq!(f.url.as_deref(), Some("http://x"));
        assert_eq!(FieldValue::all_of(&f).len(), TrackedField::ALL.len());
    }
}

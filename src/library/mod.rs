//! Source documents and the record store.
//!
//! # Data flow
//!
//! ```text
//! content/metadata/<file>.md ──► manifest ──► frontmatter ──► SourceDocument
//!                                                                  │
//!                                      strip (body → plain text) ◄─┘
//!                                                                  ▼
//!                                                 store (items table, SQLite)
//! ```

pub mod frontmatter;
pub mod manifest;
pub mod store;
pub mod strip;

pub use frontmatter::parse_document;
pub use manifest::ManifestLoader;
pub use store::{ContentStore, FieldValue, ListWrites, SqliteStore};
pub use strip::strip_markdown;

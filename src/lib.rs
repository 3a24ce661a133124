//! content-sync - Reconciliation & enrichment engine for content descriptions
//!
//! Reads a directory of markdown files with YAML front-matter, enriches each
//! entry with contributor and author data from version-control history, and
//! reconciles the result into a persistent record store.
//!
//! # Architecture
//!
//! One run is a single sequential pass:
//! - Every manifest entry is parsed, enriched and compared field by field
//!   against its stored record (Create / Update / NoOp)
//! - A failing entry is logged and skipped; the run continues
//! - Stored records whose key left the manifest are swept after the loop
//! - Changed records are forwarded to the search index
//!
//! # Modules
//!
//! - `adapters`: External system integrations (git, GitHub, Algolia)
//! - `core`: Sync logic (Reconciler, Enricher, Coordinator)
//! - `domain`: Data structures (ContentRecord, SourceDocument, RunOutcome)
//! - `library`: Manifest loading, front-matter parsing and the SQLite store
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Reconcile content/metadata into the store
//! content-sync sync
//!
//! # Preview decisions without writing
//! content-sync sync --dry-run
//!
//! # Inspect a stored record
//! content-sync show post1.md
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod library;

// Re-export main types at crate root for convenience
pub use core::{Coordinator, IndexMode, RunOptions};
pub use domain::{ContentRecord, ContentType, Decision, RecordFields, RunOutcome};
pub use error::{HistoryError, StoreError, SyncError};
pub use library::{ContentStore, ListWrites, SqliteStore};

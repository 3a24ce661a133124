//! Domain types for content-sync.
//!
//! This module contains the core data structures:
//! - Record: Stored content records and their tracked fields
//! - Source: Candidate documents parsed from the manifest
//! - Outcome: Per-item decisions and the run summary

pub mod outcome;
pub mod record;
pub mod source;

// Re-export commonly used types
pub use outcome::{Decision, FailedItem, RunOutcome};
pub use record::{ContentRecord, ContentType, ContributorStat, RecordFields, TrackedField};
pub use source::{non_empty, Enrichment, SourceDocument};

//! Core sync logic.
//!
//! This module contains:
//! - Reconciler: Per-item diff/decide/persist and the orphan sweep
//! - Enricher: Contributor and author derivation from history
//! - Avatar: Avatar resolution with a deterministic fallback
//! - Coordinator: Main run engine
//! - Lock: Exclusive run lock

pub mod avatar;
pub mod coordinator;
pub mod enricher;
pub mod lock;
pub mod reconciler;

// Re-export commonly used types
pub use avatar::{fallback_avatar, AvatarResolver};
pub use coordinator::{Coordinator, IndexMode, RunOptions};
pub use enricher::{parse_identity, parse_shortlog_line, Enricher, Identity};
pub use lock::RunLock;
pub use reconciler::{reconcile, Reconciler};

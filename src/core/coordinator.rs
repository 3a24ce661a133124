//! Run coordinator.
//!
//! Sequences one sync run: enumerate the manifest, reconcile each item in
//! order with per-item failure isolation, sweep orphans once the loop has
//! finished, then forward changes to the search index.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, field, info, instrument, warn, Span};
use uuid::Uuid;

use crate::adapters::{IndexEntry, SearchIndex};
use crate::domain::{ContentRecord, Decision, RunOutcome};
use crate::error::{StoreError, SyncError};
use crate::library::frontmatter::parse_document;
use crate::library::manifest::ManifestLoader;
use crate::library::store::ContentStore;
use crate::library::strip::strip_markdown;

use super::enricher::Enricher;
use super::reconciler::Reconciler;

/// How the search index follows the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Upsert created/updated entries, delete swept orphans
    #[default]
    Incremental,

    /// Clear the index and write every remaining record
    Rebuild,

    /// Leave the index alone
    Off,
}

impl std::fmt::Display for IndexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexMode::Incremental => write!(f, "incremental"),
            IndexMode::Rebuild => write!(f, "rebuild"),
            IndexMode::Off => write!(f, "off"),
        }
    }
}

/// Per-run switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute decisions without writing to the store or index
    pub dry_run: bool,

    pub index_mode: IndexMode,
}

/// Main sync engine
pub struct Coordinator {
    manifest: ManifestLoader,
    reconciler: Reconciler,
    enricher: Enricher,
    index: Option<Arc<dyn SearchIndex>>,
    options: RunOptions,
}

impl Coordinator {
    pub fn new(manifest: ManifestLoader, store: Arc<dyn ContentStore>, enricher: Enricher) -> Self {
        Self {
            manifest,
            reconciler: Reconciler::new(store),
            enricher,
            index: None,
            options: RunOptions::default(),
        }
    }

    /// Forward changes to a search index
    pub fn with_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute one run.
    ///
    /// Only a manifest enumeration failure aborts the run. Item failures are
    /// counted; a failed sweep is recorded in the outcome and skips the index.
    #[instrument(
        skip(self),
        fields(
            run_id = field::Empty,
            dir = %self.manifest.dir().display(),
            dry_run = self.options.dry_run
        )
    )]
    pub async fn run(&self) -> Result<RunOutcome, SyncError> {
        let run_id = Uuid::new_v4();
        Span::current().record("run_id", field::display(run_id));
        let mut outcome = RunOutcome::new(run_id, self.options.dry_run);
        info!("Starting sync");

        let ids = self.manifest.list_source_identifiers().await?;
        info!(entries = ids.len(), "Manifest loaded");

        let mut changed = Vec::new();
        for id in &ids {
            info!(filename = %id, "Processing entry");
            match self.process_item(id).await {
                Ok(decision) => {
                    if decision.is_change() {
                        changed.push(id.clone());
                    }
                    outcome.record(&decision);
                }
                Err(e) => {
                    error!(filename = %id, "Error processing entry: {}", e);
                    outcome.record_failure(id.as_str(), &e);
                }
            }
        }

        match self.sweep(&ids).await {
            Ok((orphans, records)) => {
                outcome.deleted = orphans.len();
                outcome.total_records = records.len();

                if !self.options.dry_run {
                    self.update_index(&records, &changed, &orphans, &mut outcome)
                        .await;
                }
            }
            Err(e) => {
                error!("Orphan sweep failed: {}", e);
                outcome.sweep_error = Some(e.to_string());
            }
        }

        outcome.finish();
        info!(
            processed = outcome.processed(),
            created = outcome.created,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            deleted = outcome.deleted,
            failed = outcome.failed_count(),
            results = outcome.total_records,
            "Sync complete"
        );

        Ok(outcome)
    }

    /// Remove orphans (or just find them, in a dry run) and return them with
    /// the records that remain
    async fn sweep(
        &self,
        ids: &[String],
    ) -> Result<(Vec<String>, Vec<ContentRecord>), StoreError> {
        // Keys of failed items are still in `ids`, so their records survive
        let orphans = if self.options.dry_run {
            self.find_orphans(ids).await?
        } else {
            self.reconciler.sweep_orphans(ids).await?
        };
        for orphan in &orphans {
            info!(filename = %orphan, dry_run = self.options.dry_run, "Deleted");
        }

        let orphan_set: HashSet<&str> = orphans.iter().map(String::as_str).collect();
        let records = self
            .reconciler
            .store()
            .list_all()
            .await?
            .into_iter()
            .filter(|r| !orphan_set.contains(r.filename.as_str()))
            .collect();

        Ok((orphans, records))
    }

    /// Parse, enrich, diff and persist a single manifest item
    async fn process_item(&self, id: &str) -> Result<Decision, SyncError> {
        let raw = self.manifest.load_document(id).await?;
        let document = parse_document(id, &raw)?;

        let enrichment = self
            .enricher
            .enrich(&self.manifest.path_of(id))
            .await
            .map_err(|source| SyncError::History {
                filename: id.to_string(),
                source,
            })?;

        let candidate = document.into_fields(enrichment, strip_markdown);
        let decision = self.reconciler.decide(id, &candidate).await?;

        if !self.options.dry_run {
            self.reconciler.apply(id, &decision, &candidate).await?;
        }

        match &decision {
            Decision::Create => info!(filename = %id, "Added"),
            Decision::Update { changed } => info!(filename = %id, fields = changed.len(), "Updated"),
            Decision::NoOp => info!(filename = %id, "Unchanged"),
        }

        Ok(decision)
    }

    /// Stored keys absent from the manifest, without deleting them
    async fn find_orphans(&self, ids: &[String]) -> Result<Vec<String>, StoreError> {
        let keep: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(self
            .reconciler
            .store()
            .list_all()
            .await?
            .into_iter()
            .map(|r| r.filename)
            .filter(|k| !keep.contains(k.as_str()))
            .collect())
    }

    /// Push changes to the search index; failures are logged, never fatal
    async fn update_index(
        &self,
        records: &[ContentRecord],
        changed: &[String],
        orphans: &[String],
        outcome: &mut RunOutcome,
    ) {
        let Some(index) = self.index.as_ref() else {
            return;
        };

        let result = match self.options.index_mode {
            IndexMode::Off => return,
            IndexMode::Incremental => {
                let changed: HashSet<&str> = changed.iter().map(String::as_str).collect();
                let entries: Vec<IndexEntry> = records
                    .iter()
                    .filter(|r| changed.contains(r.filename.as_str()))
                    .map(IndexEntry::from_record)
                    .collect();
                sync_incremental(index.as_ref(), &entries, orphans).await
            }
            IndexMode::Rebuild => {
                let entries: Vec<IndexEntry> = records.iter().map(IndexEntry::from_record).collect();
                rebuild(index.as_ref(), &entries).await
            }
        };

        match result {
            Ok(written) => {
                info!(index = index.name(), mode = %self.options.index_mode, written, "Search index updated");
                outcome.indexed = written;
            }
            Err(e) => {
                warn!(index = index.name(), "Search index update failed: {:#}", e);
                outcome.index_error = Some(format!("{:#}", e));
            }
        }
    }
}

async fn sync_incremental(
    index: &dyn SearchIndex,
    entries: &[IndexEntry],
    orphans: &[String],
) -> anyhow::Result<usize> {
    index.bulk_upsert(entries).await?;
    index.delete(orphans).await?;
    Ok(entries.len())
}

async fn rebuild(index: &dyn SearchIndex, entries: &[IndexEntry]) -> anyhow::Result<usize> {
    index.clear().await?;
    index.bulk_upsert(entries).await?;
    Ok(entries.len())
}

//! Command-line interface for content-sync.
//!
//! Provides commands for running a sync, listing and inspecting stored
//! records, and showing the resolved configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::{
    AlgoliaIndex, DisabledLookup, GitHistory, GithubLookup, IdentityLookup, SearchIndex,
};
use crate::config::{self, ResolvedConfig};
use crate::core::{AvatarResolver, Coordinator, Enricher, IndexMode, RunLock, RunOptions};
use crate::domain::{ContentRecord, ContentType, RunOutcome};
use crate::library::{ContentStore, ManifestLoader, SqliteStore};

/// content-sync - Reconcile content descriptions into a record store
#[derive(Parser, Debug)]
#[command(name = "content-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the metadata directory into the store
    Sync {
        /// Compute decisions without writing to the store or index
        #[arg(long)]
        dry_run: bool,

        /// Search index mode (defaults to the configured mode)
        #[arg(long, value_enum)]
        index_mode: Option<CliIndexMode>,

        /// Skip identity lookups and use fallback avatars only
        #[arg(long)]
        offline: bool,
    },

    /// List stored records
    List {
        /// Filter by content type
        #[arg(short, long, value_enum)]
        content_type: Option<CliContentType>,

        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show a stored record as JSON
    Show {
        /// Record key (file name in the metadata directory)
        filename: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Index mode for CLI (maps to IndexMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliIndexMode {
    /// Upsert changed entries and delete orphans
    Incremental,

    /// Clear the index and write every record
    Rebuild,

    /// Leave the index alone
    Off,
}

impl From<CliIndexMode> for IndexMode {
    fn from(mode: CliIndexMode) -> Self {
        match mode {
            CliIndexMode::Incremental => IndexMode::Incremental,
            CliIndexMode::Rebuild => IndexMode::Rebuild,
            CliIndexMode::Off => IndexMode::Off,
        }
    }
}

/// Content type for CLI (maps to ContentType)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliContentType {
    Multi,
    Graphic,
    Link,
    Video,
    Podcast,
}

impl From<CliContentType> for ContentType {
    fn from(t: CliContentType) -> Self {
        match t {
            CliContentType::Multi => ContentType::Multi,
            CliContentType::Graphic => ContentType::Graphic,
            CliContentType::Link => ContentType::Link,
            CliContentType::Video => ContentType::Video,
            CliContentType::Podcast => ContentType::Podcast,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Sync {
                dry_run,
                index_mode,
                offline,
            } => run_sync(dry_run, index_mode.map(Into::into), offline).await,
            Commands::List {
                content_type,
                limit,
            } => list_records(content_type.map(Into::into), limit).await,
            Commands::Show { filename } => show_record(&filename).await,
            Commands::Config => show_config(),
        }
    }
}

fn open_store(cfg: &ResolvedConfig) -> Result<SqliteStore> {
    SqliteStore::open(&cfg.store_path)
        .with_context(|| format!("Failed to open store: {}", cfg.store_path.display()))
}

/// Wire the concrete collaborators into a coordinator
fn build_coordinator(
    cfg: &ResolvedConfig,
    store: Arc<dyn ContentStore>,
    options: RunOptions,
    offline: bool,
) -> Result<Coordinator> {
    let manifest = ManifestLoader::new(&cfg.metadata_dir)
        .with_include(&cfg.include)
        .with_context(|| format!("Invalid include pattern: {}", cfg.include))?;

    let lookup: Arc<dyn IdentityLookup> = if offline || !cfg.identity.enabled {
        Arc::new(DisabledLookup)
    } else {
        Arc::new(GithubLookup::new(
            cfg.identity.api_url.clone(),
            cfg.identity.token.clone(),
        ))
    };

    let enricher = Enricher::new(
        Arc::new(GitHistory::new(&cfg.repo)),
        AvatarResolver::new(lookup),
    );

    let mut coordinator = Coordinator::new(manifest, store, enricher).with_options(options);

    match cfg.index.credentials() {
        Some((app_id, api_key)) if options.index_mode != IndexMode::Off => {
            let index: Arc<dyn SearchIndex> = Arc::new(AlgoliaIndex::new(
                app_id,
                api_key,
                cfg.index.index_name.clone(),
            ));
            coordinator = coordinator.with_index(index);
        }
        None if options.index_mode != IndexMode::Off => {
            tracing::info!("No search index credentials, skipping index");
        }
        _ => {}
    }

    Ok(coordinator)
}

/// Run one sync under the run lock
async fn run_sync(dry_run: bool, index_mode: Option<IndexMode>, offline: bool) -> Result<()> {
    let cfg = config::config()?;

    let _lock = RunLock::acquire(&cfg.home)?;

    let store: Arc<dyn ContentStore> = Arc::new(open_store(cfg)?);
    let options = RunOptions {
        dry_run,
        index_mode: index_mode.unwrap_or(cfg.index.mode),
    };

    let coordinator = build_coordinator(cfg, store, options, offline)?;
    let outcome = coordinator.run().await?;

    print_outcome(&outcome);

    if let Some(ref error) = outcome.sweep_error {
        anyhow::bail!("Orphan sweep failed: {}", error);
    }

    if !outcome.failed.is_empty() {
        anyhow::bail!("{} item(s) failed to sync", outcome.failed_count());
    }

    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    println!();
    println!("Run:        {}", outcome.run_id);
    if outcome.dry_run {
        println!("Mode:       dry run (nothing written)");
    }
    println!("Processed:  {}", outcome.processed());
    println!("Created:    {}", outcome.created);
    println!("Updated:    {}", outcome.updated);
    println!("Unchanged:  {}", outcome.unchanged);
    println!("Deleted:    {}", outcome.deleted);
    println!("Failed:     {}", outcome.failed_count());
    println!("Results:    {}", outcome.total_records);
    if outcome.indexed > 0 {
        println!("Indexed:    {}", outcome.indexed);
    }
    if let Some(ms) = outcome.duration_ms() {
        println!("Duration:   {}ms", ms);
    }

    if !outcome.failed.is_empty() {
        println!("\nFailed items:");
        for item in &outcome.failed {
            println!("  {}: {}", item.filename, item.error);
        }
    }

    if let Some(ref error) = outcome.index_error {
        println!("\nSearch index not updated: {}", error);
    }

    if let Some(ref error) = outcome.sweep_error {
        println!("\nOrphan sweep failed: {}", error);
    }
}

/// List stored records
async fn list_records(content_type: Option<ContentType>, limit: usize) -> Result<()> {
    let cfg = config::config()?;
    let store = open_store(cfg)?;

    let records: Vec<ContentRecord> = store
        .list_all()
        .await?
        .into_iter()
        .filter(|r| content_type.map_or(true, |ct| r.fields.content_type == ct))
        .collect();

    if records.is_empty() {
        println!("No records. Use 'content-sync sync' to populate the store.");
        return Ok(());
    }

    println!("{:<32} {:<10} {:<40}", "FILENAME", "TYPE", "TITLE");
    println!("{}", "-".repeat(84));

    for record in records.iter().take(limit) {
        let title = &record.fields.title;
        let title_truncated = if title.chars().count() > 37 {
            format!("{}...", title.chars().take(37).collect::<String>())
        } else {
            title.clone()
        };
        println!(
            "{:<32} {:<10} {:<40}",
            record.filename,
            record.fields.content_type.to_string(),
            title_truncated
        );
    }

    println!("\nTotal: {} records", records.len());

    Ok(())
}

/// Show a stored record as pretty JSON
async fn show_record(filename: &str) -> Result<()> {
    let cfg = config::config()?;
    let store = open_store(cfg)?;

    let record = store
        .find_by_key(filename)
        .await?
        .with_context(|| format!("No record for: {}", filename))?;

    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

/// Show resolved configuration, read fresh from disk and environment
fn show_config() -> Result<()> {
    let cfg = config::reload_config()?;

    println!("content-sync configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home (state):   {}", cfg.home.display());
    println!("  Lock file:      {}", cfg.home.join("sync.lock").display());
    println!("  Repository:     {}", cfg.repo.display());
    println!("  Metadata:       {}", cfg.metadata_dir.display());
    println!("  Include:        {}", cfg.include);
    println!("  Store:          {}", cfg.store_path.display());
    println!();
    println!("Search index:");
    println!("  Mode:           {}", cfg.index.mode);
    println!("  Index:          {}", cfg.index.index_name);
    println!(
        "  Credentials:    {}",
        if cfg.index.credentials().is_some() { "set" } else { "(not set)" }
    );
    println!();
    println!("Identity lookup:");
    println!("  Enabled:        {}", cfg.identity.enabled);
    println!("  API:            {}", cfg.identity.api_url);
    println!(
        "  Token:          {}",
        if cfg.identity.token.is_some() { "set" } else { "(not set)" }
    );

    Ok(())
}

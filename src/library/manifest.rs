//! Manifest loader: the authoritative set of source identifiers for a run.
//!
//! Identifiers are file names directly under the metadata directory,
//! filtered by an include glob and returned in sorted order.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tokio::fs;

use crate::error::SyncError;

/// Enumerates and reads source documents from a directory
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    /// Directory holding the content description files
    dir: PathBuf,

    /// File-name filter (None = every regular, non-hidden file)
    include: Option<Pattern>,
}

impl ManifestLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            include: None,
        }
    }

    /// Only list files whose name matches `pattern`
    pub fn with_include(mut self, pattern: &str) -> anyhow::Result<Self> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| anyhow::anyhow!("Invalid include pattern '{}': {}", pattern, e))?;
        self.include = Some(pattern);
        Ok(self)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document behind an identifier
    pub fn path_of(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    /// List every source identifier, sorted.
    ///
    /// Failure here is fatal to the run.
    pub async fn list_source_identifiers(&self) -> Result<Vec<String>, SyncError> {
        let manifest_err = |source| SyncError::Manifest {
            path: self.dir.clone(),
            source,
        };

        let mut entries = fs::read_dir(&self.dir).await.map_err(manifest_err)?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(manifest_err)? {
            if !entry.file_type().await.map_err(manifest_err)?.is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("Skipping non UTF-8 file name in {}", self.dir.display());
                continue;
            };

            if name.starts_with('.') {
                continue;
            }

            if let Some(ref include) = self.include {
                if !include.matches(&name) {
                    continue;
                }
            }

            ids.push(name);
        }

        ids.sort();
        Ok(ids)
    }

    /// Read the raw text of one document
    pub async fn load_document(&self, id: &str) -> Result<String, SyncError> {
        fs::read_to_string(self.path_of(id))
            .await
            .map_err(|source| SyncError::Load {
                filename: id.to_string(),
                source,
            })
    }
}

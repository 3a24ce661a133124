//! Exclusive run lock.
//!
//! Held for the whole run and released when dropped, on every exit path.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

/// An advisory lock on `<home>/sync.lock`
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without waiting; fails if another run holds it
    pub fn acquire(home: &Path) -> Result<Self> {
        fs::create_dir_all(home)
            .with_context(|| format!("Failed to create state directory: {}", home.display()))?;

        let path = home.join("sync.lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        file.try_lock_exclusive().with_context(|| {
            format!("Another sync is already running (lock held on {})", path.display())
        })?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}

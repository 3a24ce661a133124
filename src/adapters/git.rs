//! Git history adapter.
//!
//! Shells out to the `git` binary: `shortlog` for per-author contribution
//! counts and `log --diff-filter=A` for the commit that introduced a file.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use super::HistorySource;
use crate::error::HistoryError;

/// Default per-command timeout
const GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// History source backed by a local git repository
pub struct GitHistory {
    /// Repository root (passed as `git -C`)
    repo_dir: PathBuf,

    /// Path to the git binary (default: "git")
    binary_path: String,

    command_timeout: Duration,
}

impl GitHistory {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            binary_path: "git".to_string(),
            command_timeout: GIT_TIMEOUT,
        }
    }

    /// Use a custom git binary
    pub fn with_binary_path(mut self, binary_path: impl Into<String>) -> Self {
        self.binary_path = binary_path.into();
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Run git with `args` and return stdout
    async fn run(&self, args: &[&str], path: &Path) -> Result<String, HistoryError> {
        let mut command = Command::new(&self.binary_path);
        command
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .arg("--")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.command_timeout, command.output())
            .await
            .map_err(|_| {
                HistoryError::Command(format!(
                    "git {} timed out after {:?}",
                    args.first().copied().unwrap_or_default(),
                    self.command_timeout
                ))
            })?
            .map_err(|e| HistoryError::Command(format!("failed to spawn git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HistoryError::Command(format!(
                "git {} exited with {}: {}",
                args.first().copied().unwrap_or_default(),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| HistoryError::Command("git output is not valid UTF-8".to_string()))
    }
}

#[async_trait]
impl HistorySource for GitHistory {
    async fn full_history(&self, path: &Path) -> Result<Vec<String>, HistoryError> {
        // An explicit HEAD is required: without a revision shortlog reads stdin
        let stdout = self.run(&["shortlog", "-s", "-n", "-e", "HEAD"], path).await?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn first_introducing_commit(&self, path: &Path) -> Result<Option<String>, HistoryError> {
        let stdout = self
            .run(
                &["log", "--follow", "--diff-filter=A", "--format=%an <%ae>"],
                path,
            )
            .await?;

        // Newest first; the last line is the earliest introduction
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(str::to_string))
    }
}

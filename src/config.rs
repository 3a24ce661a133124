//! Configuration for content-sync.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CONTENT_SYNC_HOME, CONTENT_SYNC_DB, CONTENT_SYNC_REPO,
//!    ALGOLIA_APP_ID, ALGOLIA_API_KEY, ALGOLIA_INDEX, GH_TOKEN)
//! 2. Config file (.content-sync/config.yaml)
//! 3. Defaults (~/.content-sync, current directory as repository)
//!
//! Config file discovery:
//! - Searches current directory and parents for .content-sync/config.yaml
//! - Paths in config file are relative to the project root (the parent of .content-sync/)
//! - Credentials are only ever read from the environment

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::github::DEFAULT_API_URL;
use crate::core::IndexMode;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".content-sync";
const DEFAULT_METADATA_DIR: &str = "content/metadata";
const DEFAULT_INCLUDE: &str = "*.md";
const DEFAULT_INDEX_NAME: &str = "entries";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Version-control root (relative to project root)
    pub repo: Option<String>,
    /// Metadata directory (relative to repo)
    pub metadata_dir: Option<String>,
    /// File-name glob for manifest entries
    pub include: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file (relative to project root)
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexConfig {
    pub app_id: Option<String>,
    pub index_name: Option<String>,
    pub mode: Option<IndexMode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    pub enabled: Option<bool>,
    pub api_url: Option<String>,
}

/// Values taken from the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub db: Option<String>,
    pub repo: Option<String>,
    pub algolia_app_id: Option<String>,
    pub algolia_api_key: Option<String>,
    pub algolia_index: Option<String>,
    pub github_token: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            home: var("CONTENT_SYNC_HOME"),
            db: var("CONTENT_SYNC_DB"),
            repo: var("CONTENT_SYNC_REPO"),
            algolia_app_id: var("ALGOLIA_APP_ID"),
            algolia_api_key: var("ALGOLIA_API_KEY"),
            algolia_index: var("ALGOLIA_INDEX"),
            github_token: var("GH_TOKEN"),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory (lock file, default database)
    pub home: PathBuf,
    /// Version-control root
    pub repo: PathBuf,
    /// Directory of content description files
    pub metadata_dir: PathBuf,
    /// Manifest file-name glob
    pub include: String,
    /// SQLite database file
    pub store_path: PathBuf,
    pub index: IndexSettings,
    pub identity: IdentitySettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    pub index_name: String,
    pub mode: IndexMode,
}

impl IndexSettings {
    /// App id and API key, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.app_id, &self.api_key) {
            (Some(app_id), Some(api_key)) => Some((app_id, api_key)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub enabled: bool,
    pub api_url: String,
    pub token: Option<String>,
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge defaults, the config file and environment overrides
fn resolve(
    cwd: &Path,
    default_home: PathBuf,
    file: Option<(PathBuf, ConfigFile)>,
    env: &EnvOverrides,
) -> ResolvedConfig {
    let (config_file, config) = match file {
        Some((path, config)) => (Some(path), Some(config)),
        None => (None, None),
    };

    // Project root is the parent of .content-sync/ (or cwd without a file)
    let base_dir = config_file
        .as_deref()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .unwrap_or(cwd)
        .to_path_buf();

    let source = config.as_ref().map(|c| c.source.clone()).unwrap_or_default();
    let store = config.as_ref().map(|c| c.store.clone()).unwrap_or_default();
    let index = config.as_ref().map(|c| c.index.clone()).unwrap_or_default();
    let identity = config.as_ref().map(|c| c.identity.clone()).unwrap_or_default();

    let home = env
        .home
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or(default_home);

    let repo = if let Some(ref env_repo) = env.repo {
        resolve_path(cwd, env_repo)
    } else if let Some(ref repo) = source.repo {
        resolve_path(&base_dir, repo)
    } else {
        base_dir.clone()
    };

    let metadata_dir = resolve_path(
        &repo,
        source.metadata_dir.as_deref().unwrap_or(DEFAULT_METADATA_DIR),
    );

    let store_path = if let Some(ref db) = env.db {
        resolve_path(cwd, db)
    } else if let Some(ref path) = store.path {
        resolve_path(&base_dir, path)
    } else {
        home.join("content.db")
    };

    ResolvedConfig {
        home,
        repo,
        metadata_dir,
        include: source.include.unwrap_or_else(|| DEFAULT_INCLUDE.to_string()),
        store_path,
        index: IndexSettings {
            app_id: env.algolia_app_id.clone().or(index.app_id),
            api_key: env.algolia_api_key.clone(),
            index_name: env
                .algolia_index
                .clone()
                .or(index.index_name)
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            mode: index.mode.unwrap_or_default(),
        },
        identity: IdentitySettings {
            enabled: identity.enabled.unwrap_or(true),
            api_url: identity
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: env.github_token.clone(),
        },
        config_file,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let file = match find_config_file(&cwd) {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(resolve(&cwd, default_home, file, &EnvOverrides::from_env()))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

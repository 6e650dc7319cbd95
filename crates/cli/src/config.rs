//! Configuration loading from scriptguard.toml.

use sandbox::cache::cache_backend_or_default;
use sandbox::{ProxyWhitelist, Signature, StaticWhitelist, Whitelist};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Whitelist sources.
    #[serde(default)]
    pub whitelist: WhitelistConfig,

    /// Decision caching.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Directory relative file paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Where approved signatures come from.
#[derive(Debug, Default, Deserialize)]
pub struct WhitelistConfig {
    /// Definition files, one signature per line.
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Signatures approved inline.
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

/// Cache backend configuration.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// `"concurrent"` or `"none"`.
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

fn default_backend() -> String {
    "concurrent".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Relative whitelist paths are taken relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Create a default configuration: nothing whitelisted.
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Definition files with relative paths resolved.
    pub fn whitelist_files(&self) -> Vec<PathBuf> {
        self.whitelist
            .files
            .iter()
            .map(|f| match &self.base_dir {
                Some(base) if f.is_relative() => base.join(f),
                _ => f.clone(),
            })
            .collect()
    }

    /// Aggregate of every configured source.
    pub fn build_whitelist(&self) -> Result<Arc<ProxyWhitelist>, ConfigError> {
        let mut sources: Vec<Arc<dyn Whitelist>> = Vec::new();
        for path in self.whitelist_files() {
            let loaded = StaticWhitelist::from_file(&path).map_err(|source| ConfigError::Whitelist {
                path: path.clone(),
                source,
            })?;
            sources.push(Arc::new(loaded));
        }
        if !self.whitelist.signatures.is_empty() {
            sources.push(Arc::new(StaticWhitelist::from_signatures(
                self.whitelist.signatures.iter().cloned(),
            )));
        }
        let cache = cache_backend_or_default(&self.cache.backend);
        Ok(ProxyWhitelist::with_cache(sources, cache))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to load {}: {source}", .path.display())]
    Whitelist {
        path: PathBuf,
        source: sandbox::Error,
    },
}

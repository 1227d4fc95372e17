//! Configuration handling for the Quarry CLI.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Segmentation configuration
    #[serde(default)]
    pub segment: SegmentSection,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingSection,

    /// Query configuration
    #[serde(default)]
    pub query: QuerySection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSection,
}

impl Config {
    /// Load configuration from an explicit path, or from the default
    /// location, falling back to defaults when no file exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => config_dir().map(|dir| dir.join("config.toml")),
        };

        match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config at {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSection {
    /// Maximum chunk size (characters)
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Overlap between adjacent chunks (characters)
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Normalize whitespace and punctuation before segmentation
    #[serde(default)]
    pub normalize: bool,
}

fn default_max_chunk_size() -> usize {
    1000
}

fn default_overlap() -> usize {
    0
}

impl Default for SegmentSection {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            overlap: default_overlap(),
            normalize: false,
        }
    }
}

/// Embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    /// Chunks per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Max concurrent embedding calls
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Retries per failed batch before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_batch_size() -> usize {
    32
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
        }
    }
}

/// Query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySection {
    /// Default result count
    #[serde(default = "default_k")]
    pub k: usize,

    /// Over-fetch factor before source deduplication
    #[serde(default = "default_overfetch")]
    pub overfetch: usize,

    /// Return at most one result per source
    #[serde(default)]
    pub dedup_sources: bool,
}

fn default_k() -> usize {
    3
}

fn default_overfetch() -> usize {
    3
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            k: default_k(),
            overfetch: default_overfetch(),
            dedup_sources: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// XDG data directory, overridable with `QUARRY_DATA_DIR`.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("QUARRY_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "quarry").map(|dirs| dirs.data_dir().to_path_buf())
}

/// XDG config directory, overridable with `QUARRY_CONFIG_DIR`.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("QUARRY_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "quarry").map(|dirs| dirs.config_dir().to_path_buf())
}

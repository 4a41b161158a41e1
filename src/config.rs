use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
///
/// Every location the tool touches is spelled out here; nothing is resolved
/// relative to an implicit working directory layout.
#[derive(Debug, Clone)]
pub struct Config {
    // Inputs
    pub post_ids_path: PathBuf,
    pub posts_path: PathBuf,
    pub registry_paths: Vec<PathBuf>,

    // Archive directories
    pub archive_dir: PathBuf,
    pub image_dir: PathBuf,
    pub emote_dir: PathBuf,

    // Reports
    pub report_dir: PathBuf,

    // Fetching
    pub emote_url_base: String,
    pub emote_size_suffix: String,
    pub fetch_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Inputs
            post_ids_path: PathBuf::from(env_or_default("POST_IDS_PATH", "data/post_ids.json")),
            posts_path: PathBuf::from(env_or_default("POSTS_PATH", "data/posts.json")),
            registry_paths: parse_path_list(&env_or_default(
                "REGISTRY_PATHS",
                "data/emote_mapping_default.json,data/emote_mapping.json",
            )),

            // Archive directories
            archive_dir: PathBuf::from(env_or_default("ARCHIVE_DIR", "archive")),
            image_dir: PathBuf::from(env_or_default("IMAGE_DIR", "archive_imgs")),
            emote_dir: PathBuf::from(env_or_default("EMOTE_DIR", "emote")),

            // Reports
            report_dir: PathBuf::from(env_or_default("REPORT_DIR", "scripts/err")),

            // Fetching
            emote_url_base: env_or_default("EMOTE_URL_BASE", "https://yt3.ggpht.com/"),
            emote_size_suffix: env_or_default("EMOTE_SIZE_SUFFIX", "s240-c-k-nd"),
            fetch_timeout: Duration::from_secs(parse_env_u64("FETCH_TIMEOUT_SECS", 60)?),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry_paths.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "REGISTRY_PATHS".to_string(),
                message: "must name at least one file".to_string(),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.emote_url_base.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "EMOTE_URL_BASE".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration rooted at `root`, using the default relative layout.
    #[must_use]
    pub fn for_root(root: &std::path::Path) -> Self {
        Self {
            post_ids_path: root.join("data/post_ids.json"),
            posts_path: root.join("data/posts.json"),
            registry_paths: vec![
                root.join("data/emote_mapping_default.json"),
                root.join("data/emote_mapping.json"),
            ],
            archive_dir: root.join("archive"),
            image_dir: root.join("archive_imgs"),
            emote_dir: root.join("emote"),
            report_dir: root.join("scripts/err"),
            emote_url_base: "https://yt3.ggpht.com/".to_string(),
            emote_size_suffix: "s240-c-k-nd".to_string(),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

/// Split a comma separated list of paths, keeping order and dropping blanks.
fn parse_path_list(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

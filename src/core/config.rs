//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{CcmError, Result};

/// Environment variable pointing at an alternate ccusage executable.
pub const CCUSAGE_PATH_ENV: &str = "CCUSAGE_PATH";

/// Full monitor configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub refresh: RefreshConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// How the ccusage report is obtained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    /// Alternate ccusage executable. `None` runs it through `npx`.
    pub ccusage_path: Option<PathBuf>,
    /// Value passed to `--token-limit`.
    pub token_limit: String,
    /// Kill the report process after this many seconds.
    pub timeout_secs: u64,
    /// Extra arguments appended after the standard report flags.
    pub extra_args: Vec<String>,
}

/// Refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

/// Activity log knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

/// Filesystem paths used by ccmon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ccusage_path: None,
            token_limit: "max".to_string(),
            timeout_secs: 20,
            extra_args: Vec::new(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[CCM-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("ccmon").join("config.toml");
        let data = home_dir.join(".local").join("share").join("ccmon");
        Self {
            config_file: cfg,
            jsonl_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| CcmError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(CcmError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(CCUSAGE_PATH_ENV) {
            self.source.ccusage_path = Some(PathBuf::from(raw));
        }

        if let Some(raw) = lookup("CCMON_TOKEN_LIMIT") {
            self.source.token_limit = raw;
        }

        if let Some(raw) = lookup("CCMON_SOURCE_TIMEOUT_SECS") {
            self.source.timeout_secs = parse_env_u64("CCMON_SOURCE_TIMEOUT_SECS", &raw)?;
        }

        if let Some(raw) = lookup("CCMON_REFRESH_INTERVAL_SECS") {
            self.refresh.interval_secs = parse_env_u64("CCMON_REFRESH_INTERVAL_SECS", &raw)?;
        }

        if let Some(raw) = lookup("CCMON_LOG_ENABLED") {
            self.logging.enabled = parse_env_bool("CCMON_LOG_ENABLED", &raw)?;
        }

        if let Some(raw) = lookup("CCMON_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.refresh.interval_secs == 0 {
            return Err(CcmError::InvalidConfig {
                details: "refresh.interval_secs must be >= 1".to_string(),
            });
        }

        if self.source.timeout_secs == 0 {
            return Err(CcmError::InvalidConfig {
                details: "source.timeout_secs must be >= 1".to_string(),
            });
        }

        if self.source.token_limit.trim().is_empty() {
            return Err(CcmError::InvalidConfig {
                details: "source.token_limit must not be empty".to_string(),
            });
        }

        if self
            .source
            .ccusage_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(CcmError::InvalidConfig {
                details: "source.ccusage_path must not be empty when set".to_string(),
            });
        }

        if self.logging.enabled && self.logging.max_rotated_files == 0 {
            return Err(CcmError::InvalidConfig {
                details: "logging.max_rotated_files must be >= 1 when logging is enabled"
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| CcmError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| CcmError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

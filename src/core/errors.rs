//! CCM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, CcmError>;

/// Top-level error type for the usage monitor.
#[derive(Debug, Error)]
pub enum CcmError {
    #[error("[CCM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CCM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CCM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CCM-2001] usage data source unavailable: {details}")]
    DataSourceUnavailable { details: String },

    #[error("[CCM-2002] usage data source timed out after {secs}s")]
    DataSourceTimeout { secs: u64 },

    #[error("[CCM-2003] no usable accounting block: {details}")]
    NoData { details: String },

    #[error("[CCM-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CCM-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[CCM-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[CCM-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl CcmError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CCM-1001",
            Self::MissingConfig { .. } => "CCM-1002",
            Self::ConfigParse { .. } => "CCM-1003",
            Self::DataSourceUnavailable { .. } => "CCM-2001",
            Self::DataSourceTimeout { .. } => "CCM-2002",
            Self::NoData { .. } => "CCM-2003",
            Self::Serialization { .. } => "CCM-2101",
            Self::Io { .. } => "CCM-3002",
            Self::ChannelClosed { .. } => "CCM-3003",
            Self::Runtime { .. } => "CCM-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DataSourceUnavailable { .. }
                | Self::DataSourceTimeout { .. }
                | Self::NoData { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Whether this failure collapses to the `"No data"` status.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(
            self,
            Self::DataSourceUnavailable { .. } | Self::DataSourceTimeout { .. } | Self::NoData { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for CcmError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for CcmError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

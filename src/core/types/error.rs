use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the configuration.
/// These are always fatal and surface before any worker starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("'{0}' is missing in the config")]
    MissingField(&'static str),

    #[error("no targets configured")]
    NoTargets,

    #[error("invalid bucket '{0}' (expected one of: second, minute, hour)")]
    InvalidBucket(String),

    #[error("invalid entry pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid ignore glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },
}

/// Violations of guarantees the series pipeline is supposed to uphold.
/// Hitting one of these means a bug upstream, not bad user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("finalized series has no bin 0 to carry forward from")]
    MissingOrigin,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("target '{target}': {message}")]
    Target { target: String, message: String },

    #[error("series '{series}' of target '{target}': {source}")]
    Series {
        target: String,
        series: String,
        source: SeriesError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl AppError {
    pub fn target(target: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Target {
            target: target.into(),
            message: message.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

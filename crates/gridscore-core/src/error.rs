//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration or binding rules to it.
///
/// These are only ever produced at configuration time, never while a
/// scheduling decision is running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown scoring rule kind: {0}")]
    UnknownRule(String),

    #[error("rule {rule}: unknown option `{option}`")]
    UnknownOption { rule: String, option: String },

    #[error("rule {rule}: option `{option}` {reason}")]
    InvalidOption {
        rule: String,
        option: String,
        reason: String,
    },

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("node {0} has no executors")]
    NoExecutors(String),
}

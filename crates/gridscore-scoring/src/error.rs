//! Scoring error types.

use thiserror::Error;

/// An unrecoverable failure inside a scoring rule.
///
/// Returning this from a rule aborts the whole decision. Unavailable
/// per-node metrics are never reported this way.
#[derive(Debug, Error)]
pub enum RuleFailure {
    #[error("rule misconfigured: {0}")]
    Misconfigured(String),

    #[error("rule failed: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A rule chain stopped because one of its rules failed.
#[derive(Debug, Error)]
#[error("scoring rule {rule} aborted the decision: {source}")]
pub struct ChainAbort {
    pub rule: String,
    #[source]
    pub source: RuleFailure,
}

pub type RuleResult<T> = Result<T, RuleFailure>;

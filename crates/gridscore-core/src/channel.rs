//! Remote probe transport contract.
//!
//! Nodes are probed through a typed request instead of script text: the
//! scheduler asks a [`NodeChannel`] to run a [`Probe`] and gets the raw
//! textual response back. Parsing the response belongs to the metric
//! collector so the wire contract lives in one place.
//!
//! # Wire contract
//!
//! - [`Probe::LoadStatistics`] answers with the diagnostic rendering of the
//!   node's `/proc/loadavg`, i.e. [`RESULT_PREFIX`] followed by the file
//!   contents. Token 1 of the whitespace split is the 1-minute average.
//! - [`Probe::CoreCount`] answers with the captured stdout of `nproc`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Virtual load-statistics resource read by [`Probe::LoadStatistics`].
pub const LOAD_STATISTICS_PATH: &str = "/proc/loadavg";

/// Core enumeration utility run by [`Probe::CoreCount`].
pub const CORE_COUNT_COMMAND: &str = "nproc";

/// Prefix of a rendered diagnostic result.
pub const RESULT_PREFIX: &str = "Result: ";

/// Diagnostic probes a node can be asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    LoadStatistics,
    CoreCount,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::LoadStatistics => f.write_str("load-statistics"),
            Probe::CoreCount => f.write_str("core-count"),
        }
    }
}

/// Render a diagnostic result the way remote agents report it.
pub fn render_result(text: &str) -> String {
    format!("{RESULT_PREFIX}{text}")
}

/// Transport-level failures reported by a channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The node cannot run this probe (e.g. a different OS).
    #[error("probe {0} not supported by node")]
    Unsupported(Probe),

    /// The channel to the node is gone.
    #[error("channel closed: {0}")]
    Closed(String),

    #[error("probe i/o failed: {0}")]
    Io(String),
}

/// Boxed future returned by [`NodeChannel::execute`].
pub type ProbeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, ChannelError>> + Send + 'a>>;

/// An execution channel to a single node, injected for testability.
pub trait NodeChannel: Send + Sync + fmt::Debug {
    /// Run `probe` on the node and return its raw textual output.
    fn execute(&self, probe: Probe) -> ProbeFuture<'_>;
}

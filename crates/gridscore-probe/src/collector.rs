//! Node metric collection.
//!
//! Runs the load-statistics and core-count probes against a node's
//! channel, each bounded by a timeout, and parses the responses into
//! [`NodeMetrics`]. Every failure mode is reported as a [`ProbeError`];
//! none of them is meant to abort a scheduling decision.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use gridscore_core::{ChannelError, Node, NodeChannel, NodeId, Probe};

/// Parsed metrics for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMetrics {
    /// 1-minute load average.
    pub load: f64,
    /// Logical CPU cores.
    pub cores: i64,
}

/// Why metrics for a node are unavailable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    /// The node has no execution channel.
    #[error("node {0} has no channel")]
    NoChannel(NodeId),

    /// The probe ran but its output is not a number.
    #[error("{probe} output is not a number: {output:?}")]
    Unparseable { probe: Probe, output: String },

    #[error("{0} probe timed out after {1:?}")]
    Timeout(Probe, Duration),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl ProbeError {
    /// Whether the transport itself failed (as opposed to the node
    /// answering with something unusable).
    pub fn is_channel_fault(&self) -> bool {
        matches!(
            self,
            ProbeError::Channel(ChannelError::Closed(_) | ChannelError::Io(_))
        )
    }
}

/// Collects load and core metrics from nodes. Holds no per-node state and
/// performs no retries.
#[derive(Debug, Clone)]
pub struct MetricCollector {
    timeout: Duration,
}

impl MetricCollector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run both probes against `node` and combine the results.
    pub async fn collect(&self, node: &Node) -> Result<NodeMetrics, ProbeError> {
        let channel = node
            .channel
            .as_deref()
            .ok_or_else(|| ProbeError::NoChannel(node.id.clone()))?;

        let (load, cores) = tokio::join!(self.probe_load(channel), self.probe_cores(channel));
        let metrics = NodeMetrics {
            load: load?,
            cores: cores?,
        };
        debug!(node = %node.id, load = metrics.load, cores = metrics.cores, "collected node metrics");
        Ok(metrics)
    }

    /// 1-minute load average of the node behind `channel`.
    pub async fn probe_load(&self, channel: &dyn NodeChannel) -> Result<f64, ProbeError> {
        let output = self.run(channel, Probe::LoadStatistics).await?;
        parse_load(&output)
    }

    /// Logical core count of the node behind `channel`.
    pub async fn probe_cores(&self, channel: &dyn NodeChannel) -> Result<i64, ProbeError> {
        let output = self.run(channel, Probe::CoreCount).await?;
        parse_cores(&output)
    }

    async fn run(&self, channel: &dyn NodeChannel, probe: Probe) -> Result<String, ProbeError> {
        match tokio::time::timeout(self.timeout, channel.execute(probe)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                debug!(error = %e, %probe, "probe failed");
                Err(e.into())
            }
            Err(_) => {
                debug!(%probe, timeout = ?self.timeout, "probe timed out");
                Err(ProbeError::Timeout(probe, self.timeout))
            }
        }
    }
}

/// Parse a load-statistics response: whitespace token 1 as a float.
pub fn parse_load(output: &str) -> Result<f64, ProbeError> {
    output
        .split_whitespace()
        .nth(1)
        .and_then(|token| token.parse::<f64>().ok())
        .filter(|load| load.is_finite())
        .ok_or_else(|| ProbeError::Unparseable {
            probe: Probe::LoadStatistics,
            output: output.to_string(),
        })
}

/// Parse a core-count response: the whole trimmed output as an integer.
pub fn parse_cores(output: &str) -> Result<i64, ProbeError> {
    output
        .trim()
        .parse::<i64>()
        .map_err(|_| ProbeError::Unparseable {
            probe: Probe::CoreCount,
            output: output.to_string(),
        })
}

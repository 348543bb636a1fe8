//! Channel implementations.
//!
//! - [`LocalChannel`] probes the machine gridscore itself runs on.
//! - [`StaticChannel`] answers with fixed responses; used for configured
//!   simulation nodes and in tests.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gridscore_core::channel::{CORE_COUNT_COMMAND, LOAD_STATISTICS_PATH, render_result};
use gridscore_core::config::parse_duration;
use gridscore_core::{
    ChannelError, ConfigResult, Node, NodeChannel, NodeSpec, Probe, ProbeFuture, ProbeMode,
    ProbeSpec,
};

/// Probes the local host: reads `/proc/loadavg` and runs `nproc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalChannel;

impl LocalChannel {
    async fn load_statistics() -> Result<String, ChannelError> {
        match tokio::fs::read_to_string(LOAD_STATISTICS_PATH).await {
            Ok(contents) => Ok(render_result(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ChannelError::Unsupported(Probe::LoadStatistics))
            }
            Err(e) => Err(ChannelError::Io(e.to_string())),
        }
    }

    async fn core_count() -> Result<String, ChannelError> {
        let output = match tokio::process::Command::new(CORE_COUNT_COMMAND)
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ChannelError::Unsupported(Probe::CoreCount));
            }
            Err(e) => return Err(ChannelError::Io(e.to_string())),
        };

        if !output.status.success() {
            return Err(ChannelError::Io(format!(
                "{CORE_COUNT_COMMAND} exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl NodeChannel for LocalChannel {
    fn execute(&self, probe: Probe) -> ProbeFuture<'_> {
        Box::pin(async move {
            match probe {
                Probe::LoadStatistics => Self::load_statistics().await,
                Probe::CoreCount => Self::core_count().await,
            }
        })
    }
}

/// A channel with canned responses. Probes without a response are
/// reported as unsupported.
#[derive(Debug, Default)]
pub struct StaticChannel {
    responses: HashMap<Probe, Result<String, ChannelError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load(self, output: impl Into<String>) -> Self {
        self.with_response(Probe::LoadStatistics, Ok(output.into()))
    }

    pub fn with_cores(self, output: impl Into<String>) -> Self {
        self.with_response(Probe::CoreCount, Ok(output.into()))
    }

    pub fn with_fault(self, probe: Probe, error: ChannelError) -> Self {
        self.with_response(probe, Err(error))
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn with_response(mut self, probe: Probe, response: Result<String, ChannelError>) -> Self {
        self.responses.insert(probe, response);
        self
    }

    /// Number of probes executed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl NodeChannel for StaticChannel {
    fn execute(&self, probe: Probe) -> ProbeFuture<'_> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let response = self
            .responses
            .get(&probe)
            .cloned()
            .unwrap_or(Err(ChannelError::Unsupported(probe)));
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        })
    }
}

/// Build the channel described by a node's `probe` config entry.
pub fn channel_for(spec: &ProbeSpec) -> ConfigResult<Arc<dyn NodeChannel>> {
    match spec {
        ProbeSpec::Mode(ProbeMode::Local) => Ok(Arc::new(LocalChannel)),
        ProbeSpec::Static { load, cores, delay } => {
            let mut channel = StaticChannel::new();
            if let Some(load) = load {
                channel = channel.with_load(load.clone());
            }
            if let Some(cores) = cores {
                channel = channel.with_cores(cores.clone());
            }
            if let Some(delay) = delay {
                channel = channel.with_delay(parse_duration(delay)?);
            }
            Ok(Arc::new(channel))
        }
    }
}

/// Build a node from config, attaching its channel when one is configured.
pub fn node_from_spec(spec: &NodeSpec) -> ConfigResult<Node> {
    let node = spec.to_node();
    match &spec.probe {
        Some(probe) => Ok(node.with_channel(channel_for(probe)?)),
        None => Ok(node),
    }
}

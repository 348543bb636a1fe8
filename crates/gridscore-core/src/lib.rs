//! gridscore-core — shared scheduling types, the node probe channel
//! contract, and `gridscore.toml` parsing.

pub mod channel;
pub mod config;
pub mod error;
pub mod types;

pub use channel::{ChannelError, NodeChannel, Probe, ProbeFuture};
pub use config::{BalancerConfig, GridConfig, NodeSpec, ProbeConfig, ProbeMode, ProbeSpec, RuleSpec};
pub use error::{ConfigError, ConfigResult};
pub use types::*;

//! gridscore-probe — remote node metric collection.
//!
//! Asks a node's [`NodeChannel`](gridscore_core::NodeChannel) for its load
//! statistics and core count, bounded by a per-probe timeout.
//!
//! # Architecture
//!
//! ```text
//! MetricCollector::collect(node)
//!   ├── probe_load  → Probe::LoadStatistics → parse_load  → f64
//!   └── probe_cores → Probe::CoreCount      → parse_cores → i64
//! ```
//!
//! Failures (no channel, unsupported probe, non-numeric output, timeout,
//! transport fault) all surface as [`ProbeError`]. Callers treat them as
//! "no data" for that node.

pub mod channels;
pub mod collector;

pub use channels::{LocalChannel, StaticChannel, channel_for, node_from_spec};
pub use collector::{MetricCollector, NodeMetrics, ProbeError, parse_cores, parse_load};

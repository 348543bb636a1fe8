//! Score event sinks.
//!
//! Rules report what they contributed per node through a [`ScoreSink`]
//! handed to them with the decision, rather than logging directly.

use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

use gridscore_core::NodeId;

/// One rule's contribution to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreEvent {
    pub rule: String,
    pub node: NodeId,
    /// Score before the rule's scale factor.
    pub raw: i64,
    /// Amount added to the ledger.
    pub delta: i64,
}

impl ScoreEvent {
    pub fn new(rule: &str, node: &str, raw: i64, delta: i64) -> Self {
        Self {
            rule: rule.to_string(),
            node: node.to_string(),
            raw,
            delta,
        }
    }
}

/// Receives per-node score events. Not required for correctness.
pub trait ScoreSink: Send + Sync {
    fn node_scored(&self, event: &ScoreEvent);
}

/// Emits every event as an info-level tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ScoreSink for TracingSink {
    fn node_scored(&self, event: &ScoreEvent) {
        info!(
            rule = %event.rule,
            node = %event.node,
            score = event.raw,
            delta = event.delta,
            "{} got score {}",
            event.node,
            event.raw
        );
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ScoreEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScoreEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Remove and return all recorded events.
    pub fn drain(&self) -> Vec<ScoreEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl ScoreSink for RecordingSink {
    fn node_scored(&self, event: &ScoreEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

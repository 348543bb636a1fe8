//! Per-decision node score ledger.
//!
//! A ledger is created for one scheduling decision, handed to each rule of
//! the chain by `&mut`, and dropped when the decision ends. Rules can only
//! add to a node's score; nothing resets or overwrites an entry.

use std::collections::HashMap;

use gridscore_core::NodeId;

/// Accumulated score per node. Unseen nodes score 0.
#[derive(Debug, Default)]
pub struct NodeScoreLedger {
    /// Insertion order, used for deterministic tie-breaks.
    order: Vec<NodeId>,
    scores: HashMap<NodeId, i64>,
}

impl NodeScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger holding `nodes` at score 0, in the given order.
    pub fn seeded<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let mut ledger = Self::new();
        for node in nodes {
            let node: NodeId = node.into();
            ledger.add(&node, 0);
        }
        ledger
    }

    /// Add `delta` to `node`'s score. Scores saturate at the `i64` bounds.
    pub fn add(&mut self, node: &str, delta: i64) {
        match self.scores.get_mut(node) {
            Some(score) => *score = score.saturating_add(delta),
            None => {
                self.order.push(node.to_string());
                self.scores.insert(node.to_string(), delta);
            }
        }
    }

    pub fn get(&self, node: &str) -> i64 {
        self.scores.get(node).copied().unwrap_or(0)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.scores.contains_key(node)
    }

    /// Known nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `candidates` with their scores, best first. Equal scores keep
    /// candidate order.
    pub fn rank_of<'a>(&self, candidates: &[&'a str]) -> Vec<(&'a str, i64)> {
        let mut ranked: Vec<(&'a str, i64)> =
            candidates.iter().map(|&node| (node, self.get(node))).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// All entries, best first. Equal scores keep insertion order.
    pub fn ranked(&self) -> Vec<(&str, i64)> {
        let mut entries: Vec<(&str, i64)> = self.nodes().map(|n| (n, self.get(n))).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

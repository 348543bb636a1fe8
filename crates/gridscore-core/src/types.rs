//! Shared scheduling types used across gridscore crates.
//!
//! A scheduling call works on a [`Worksheet`] (the nodes under
//! consideration plus the work chunks of one [`Task`]) and produces a
//! [`Mapping`] from chunk index to node id.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::channel::NodeChannel;

/// Unique identifier for a node in the cluster.
pub type NodeId = String;

// ── Node ───────────────────────────────────────────────────────────

/// A worker node that can host work chunks.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub labels: BTreeSet<String>,
    /// How many chunks of one mapping this node may host.
    pub executors: u32,
    /// Node-level preference used by the node preference rule.
    pub preference: i64,
    /// Remote execution channel. `None` means the node cannot be probed.
    pub channel: Option<Arc<dyn NodeChannel>>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            labels: BTreeSet::new(),
            executors: 1,
            preference: 0,
            channel: None,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn with_executors(mut self, executors: u32) -> Self {
        self.executors = executors;
        self
    }

    pub fn with_preference(mut self, preference: i64) -> Self {
        self.preference = preference;
        self
    }

    pub fn with_channel(mut self, channel: Arc<dyn NodeChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

// ── Task ───────────────────────────────────────────────────────────

/// Project-level preference for nodes carrying a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPreference {
    pub label: String,
    pub preference: i64,
}

/// Outcome of a past build of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    Aborted,
    NotBuilt,
}

/// A past build: which node ran it and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub node: NodeId,
    pub result: BuildResult,
}

/// The root task being scheduled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub preferences: Vec<LabelPreference>,
    /// Recent builds, newest first.
    #[serde(default)]
    pub history: Vec<BuildRecord>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_preference(mut self, label: impl Into<String>, preference: i64) -> Self {
        self.preferences.push(LabelPreference {
            label: label.into(),
            preference,
        });
        self
    }

    pub fn with_build(mut self, node: impl Into<NodeId>, result: BuildResult) -> Self {
        self.history.push(BuildRecord {
            node: node.into(),
            result,
        });
        self
    }
}

// ── Work chunks ────────────────────────────────────────────────────

/// A group of sub-tasks that must run together on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkChunk {
    pub index: usize,
    pub subtasks: Vec<String>,
    /// Nodes admission logic considers able to run this chunk, in
    /// preference order. Ties in scoring resolve to the earlier entry.
    pub candidates: Vec<NodeId>,
}

/// Nodes and chunks considered by one scheduling call.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    pub nodes: Vec<Node>,
    pub chunks: Vec<WorkChunk>,
}

impl Worksheet {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            chunks: Vec::new(),
        }
    }

    /// Append a chunk that may run on the given candidates.
    pub fn push_chunk<I, S>(&mut self, subtasks: Vec<String>, candidates: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let index = self.chunks.len();
        self.chunks.push(WorkChunk {
            index,
            subtasks,
            candidates: candidates.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Candidates of `chunk` that exist and still have a free executor
    /// given the assignments already in `mapping`. Candidate order is kept.
    pub fn feasible_nodes<'a>(&'a self, chunk: &'a WorkChunk, mapping: &Mapping) -> Vec<&'a Node> {
        let mut seen = BTreeSet::new();
        chunk
            .candidates
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.node(id))
            .filter(|node| mapping.assigned_to(&node.id) < node.executors as usize)
            .collect()
    }
}

// ── Mapping ────────────────────────────────────────────────────────

/// Partial assignment of chunk index → node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    assignments: Vec<Option<NodeId>>,
}

impl Mapping {
    /// An empty mapping for a worksheet with `chunks` chunks.
    pub fn new(chunks: usize) -> Self {
        Self {
            assignments: vec![None; chunks],
        }
    }

    pub fn for_worksheet(worksheet: &Worksheet) -> Self {
        Self::new(worksheet.chunks.len())
    }

    /// Assign `chunk` to `node`, replacing any earlier assignment.
    ///
    /// A `chunk` index past the end of the mapping is a no-op.
    pub fn assign(&mut self, chunk: usize, node: impl Into<NodeId>) {
        if let Some(slot) = self.assignments.get_mut(chunk) {
            *slot = Some(node.into());
        }
    }

    /// Clear the assignment of `chunk`. Out-of-range indices are a no-op.
    pub fn unassign(&mut self, chunk: usize) {
        if let Some(slot) = self.assignments.get_mut(chunk) {
            *slot = None;
        }
    }

    pub fn get(&self, chunk: usize) -> Option<&str> {
        self.assignments.get(chunk).and_then(|n| n.as_deref())
    }

    /// Number of chunks currently assigned to `node`.
    pub fn assigned_to(&self, node: &str) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.as_deref() == Some(node))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.assignments.iter().all(Option::is_some)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&str>)> {
        self.assignments
            .iter()
            .enumerate()
            .map(|(i, a)| (i, a.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worksheet() -> Worksheet {
        let mut ws = Worksheet::new(vec![
            Node::new("a").with_executors(1),
            Node::new("b").with_executors(2),
        ]);
        ws.push_chunk(vec!["build".into()], ["a", "b", "missing"]);
        ws.push_chunk(vec!["test".into()], ["b", "a"]);
        ws
    }

    #[test]
    fn feasible_nodes_keep_candidate_order() {
        let ws = worksheet();
        let mapping = Mapping::for_worksheet(&ws);

        let ids: Vec<&str> = ws
            .feasible_nodes(&ws.chunks[1], &mapping)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn feasible_nodes_skip_unknown_candidates() {
        let ws = worksheet();
        let mapping = Mapping::for_worksheet(&ws);

        let feasible = ws.feasible_nodes(&ws.chunks[0], &mapping);
        assert_eq!(feasible.len(), 2);
    }

    #[test]
    fn feasible_nodes_respect_executor_count() {
        let ws = worksheet();
        let mut mapping = Mapping::for_worksheet(&ws);
        mapping.assign(0, "a");

        let ids: Vec<&str> = ws
            .feasible_nodes(&ws.chunks[1], &mapping)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b"]); // "a" has a single executor, already taken.
    }

    #[test]
    fn mapping_tracks_assignments() {
        let mut mapping = Mapping::new(2);
        assert!(!mapping.is_complete());

        mapping.assign(0, "b");
        mapping.assign(1, "b");

        assert!(mapping.is_complete());
        assert_eq!(mapping.get(0), Some("b"));
        assert_eq!(mapping.assigned_to("b"), 2);
        assert_eq!(mapping.assigned_to("a"), 0);

        mapping.unassign(1);
        assert!(!mapping.is_complete());
        assert_eq!(mapping.assigned_to("b"), 1);
    }

    #[test]
    fn out_of_range_chunk_is_a_no_op() {
        let mut mapping = Mapping::new(1);
        mapping.assign(7, "x");
        mapping.unassign(7);

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get(7), None);
        assert_eq!(mapping.assigned_to("x"), 0);
    }

    #[test]
    fn task_builders() {
        let task = Task::new("job")
            .with_preference("linux", 5)
            .with_build("a", BuildResult::Failure);
        assert_eq!(task.preferences[0].label, "linux");
        assert_eq!(task.history[0].result, BuildResult::Failure);
    }
}

//! The scoring rule contract.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use gridscore_core::{Mapping, Node, Task, WorkChunk, Worksheet};

use crate::error::RuleResult;
use crate::ledger::NodeScoreLedger;
use crate::sink::{ScoreEvent, ScoreSink};

/// Boxed future returned by [`ScoringRule::update_scores`].
pub type RuleFuture<'a> = Pin<Box<dyn Future<Output = RuleResult<bool>> + Send + 'a>>;

/// Everything a rule may read during one scheduling decision.
pub struct Decision<'a> {
    pub task: &'a Task,
    /// The chunk being placed.
    pub chunk: &'a WorkChunk,
    /// Assignments made so far in this scheduling call. Read-only.
    pub mapping: &'a Mapping,
    pub worksheet: &'a Worksheet,
    pub sink: &'a dyn ScoreSink,
}

impl<'a> Decision<'a> {
    pub fn node(&self, id: &str) -> Option<&'a Node> {
        self.worksheet.node(id)
    }

    /// Report a per-node contribution to the sink.
    pub fn report(&self, rule: &str, node: &str, raw: i64, delta: i64) {
        self.sink.node_scored(&ScoreEvent::new(rule, node, raw, delta));
    }
}

impl fmt::Debug for Decision<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decision")
            .field("task", &self.task.name)
            .field("chunk", &self.chunk.index)
            .field("mapping", self.mapping)
            .finish_non_exhaustive()
    }
}

/// A composable unit of scoring logic.
///
/// Implementations hold only immutable configuration, so one instance can
/// serve any number of decisions, including concurrent ones.
pub trait ScoringRule: Send + Sync + fmt::Debug {
    /// Rule kind, as used in configuration.
    fn name(&self) -> &str;

    /// Add this rule's influence to `ledger` via [`NodeScoreLedger::add`].
    ///
    /// Resolves to `Ok(true)` when later rules should still run, `Ok(false)`
    /// to make this rule's result final for the decision, or `Err` to abort
    /// the decision. Per-node metric failures must be scored as 0, not
    /// returned as errors.
    fn update_scores<'a>(
        &'a self,
        decision: &'a Decision<'a>,
        ledger: &'a mut NodeScoreLedger,
    ) -> RuleFuture<'a>;
}

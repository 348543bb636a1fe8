//! Scoring load balancer.
//!
//! Places each work chunk of a task on the feasible node with the highest
//! score after running the rule chain. If the chain aborts, the whole
//! scheduling call is delegated to the fallback strategy instead.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use gridscore_core::{BalancerConfig, ConfigResult, GridConfig, Mapping, NodeId, Task, WorkChunk, Worksheet};

use crate::chain::RuleChain;
use crate::error::ChainAbort;
use crate::fallback::FallbackStrategy;
use crate::ledger::NodeScoreLedger;
use crate::registry::RuleRegistry;
use crate::rule::Decision;
use crate::sink::{ScoreSink, TracingSink};

/// Result of one scheduling call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "mapping", rename_all = "snake_case")]
pub enum Placement {
    /// Produced by rule-based scoring. `None` when some chunk had no
    /// feasible node; the task should stay queued.
    Scored(Option<Mapping>),
    /// Produced by the fallback strategy.
    Fallback(Option<Mapping>),
}

impl Placement {
    pub fn mapping(&self) -> Option<&Mapping> {
        match self {
            Placement::Scored(m) | Placement::Fallback(m) => m.as_ref(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Placement::Fallback(_))
    }
}

/// Orchestrates scheduling decisions over a rule chain.
///
/// Holds no per-decision state: every decision gets a fresh ledger, so one
/// balancer can serve concurrent scheduling calls.
pub struct ScoringLoadBalancer {
    chain: RuleChain,
    fallback: Arc<dyn FallbackStrategy>,
    sink: Arc<dyn ScoreSink>,
    enabled: bool,
    report_scores: bool,
}

impl ScoringLoadBalancer {
    pub fn new(chain: RuleChain, fallback: Arc<dyn FallbackStrategy>) -> Self {
        Self {
            chain,
            fallback,
            sink: Arc::new(TracingSink),
            enabled: true,
            report_scores: false,
        }
    }

    /// Build the chain from `config.rules` and apply `[balancer]` settings.
    pub fn from_config(
        config: &GridConfig,
        registry: &RuleRegistry,
        fallback: Arc<dyn FallbackStrategy>,
    ) -> ConfigResult<Self> {
        let chain = registry.build_chain(&config.rules)?;
        Ok(Self::new(chain, fallback).with_settings(&config.balancer))
    }

    pub fn with_settings(mut self, settings: &BalancerConfig) -> Self {
        self.enabled = settings.enabled;
        self.report_scores = settings.report_scores;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ScoreSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn chain(&self) -> &RuleChain {
        &self.chain
    }

    /// Score the feasible nodes for `chunk` and pick the best one.
    ///
    /// Ties go to the node listed first among the chunk's candidates.
    /// Returns `Ok(None)` when no candidate is feasible.
    pub async fn decide(
        &self,
        task: &Task,
        worksheet: &Worksheet,
        chunk: &WorkChunk,
        mapping: &Mapping,
    ) -> Result<Option<NodeId>, ChainAbort> {
        let ranked = self.rank(task, worksheet, chunk, mapping).await?;
        Ok(ranked.into_iter().next())
    }

    /// Feasible nodes for `chunk`, best score first, ties in candidate
    /// order. Runs the chain once against a fresh ledger.
    async fn rank(
        &self,
        task: &Task,
        worksheet: &Worksheet,
        chunk: &WorkChunk,
        mapping: &Mapping,
    ) -> Result<Vec<NodeId>, ChainAbort> {
        let feasible: Vec<&str> = worksheet
            .feasible_nodes(chunk, mapping)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        if feasible.is_empty() {
            debug!(task = %task.name, chunk = chunk.index, "no feasible node for chunk");
            return Ok(Vec::new());
        }

        let mut ledger = NodeScoreLedger::seeded(feasible.iter().copied());
        let decision = Decision {
            task,
            chunk,
            mapping,
            worksheet,
            sink: self.sink.as_ref(),
        };
        let report = self.chain.run(&decision, &mut ledger).await?;

        if self.report_scores {
            info!(
                task = %task.name,
                chunk = chunk.index,
                rules = ?report.executed,
                scores = ?ledger.ranked(),
                "node scores"
            );
        }

        let ranked = ledger.rank_of(&feasible);
        if let Some((node, score)) = ranked.first() {
            debug!(task = %task.name, chunk = chunk.index, %node, score, "best node for chunk");
        }
        Ok(ranked.into_iter().map(|(node, _)| node.to_string()).collect())
    }

    /// Map every chunk of `worksheet`.
    ///
    /// Chunks are placed in order, each on the best-scoring node that still
    /// has room. When a later chunk has nowhere to go, the search backs up
    /// and tries the next-best node for the chunk before it. Every visit to
    /// a chunk is a fresh decision with its own ledger.
    pub async fn map(&self, task: &Task, worksheet: &Worksheet) -> Placement {
        if !self.enabled {
            return Placement::Fallback(self.fallback.map(task, worksheet));
        }

        let chunks = &worksheet.chunks;
        let mut mapping = Mapping::for_worksheet(worksheet);
        // Untried nodes per placed chunk, best last so `pop` takes the best.
        let mut options: Vec<Vec<NodeId>> = Vec::with_capacity(chunks.len());

        while options.len() < chunks.len() {
            let chunk = &chunks[options.len()];
            let mut ranked = match self.rank(task, worksheet, chunk, &mapping).await {
                Ok(ranked) => ranked,
                Err(abort) => {
                    warn!(
                        task = %task.name,
                        error = %abort,
                        "scoring aborted, delegating to fallback strategy"
                    );
                    return Placement::Fallback(self.fallback.map(task, worksheet));
                }
            };
            ranked.reverse();
            options.push(ranked);

            // Take the next option at the deepest level that still has one.
            loop {
                let Some(level) = options.len().checked_sub(1) else {
                    debug!(task = %task.name, "no complete placement exists");
                    return Placement::Scored(None);
                };
                match options[level].pop() {
                    Some(node) => {
                        mapping.assign(chunks[level].index, node);
                        break;
                    }
                    None => {
                        options.pop();
                        if let Some(parent) = level.checked_sub(1) {
                            mapping.unassign(chunks[parent].index);
                            debug!(task = %task.name, chunk = chunks[parent].index, "backtracking");
                        }
                    }
                }
            }
        }

        info!(task = %task.name, chunks = mapping.len(), "task mapped by scoring");
        Placement::Scored(Some(mapping))
    }
}

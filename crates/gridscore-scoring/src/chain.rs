//! Rule chain runner.
//!
//! Applies an ordered list of rules to one ledger. Rules run strictly one
//! after another; a rule returning `false` ends the chain, a rule failure
//! aborts it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ChainAbort;
use crate::ledger::NodeScoreLedger;
use crate::rule::{Decision, ScoringRule};

/// What happened during one chain run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Rules that ran to completion, in order.
    pub executed: Vec<String>,
    /// The rule that asked for later rules to be skipped, if any.
    pub stopped_by: Option<String>,
}

/// An ordered sequence of scoring rules.
#[derive(Debug, Clone, Default)]
pub struct RuleChain {
    rules: Vec<Arc<dyn ScoringRule>>,
}

impl RuleChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: Arc<dyn ScoringRule>) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: Arc<dyn ScoringRule>) -> Self {
        self.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name())
    }

    /// Run every rule against `ledger` in order.
    ///
    /// On `Err` the ledger may hold contributions of the rules that ran
    /// before the failure; callers must discard it.
    pub async fn run(
        &self,
        decision: &Decision<'_>,
        ledger: &mut NodeScoreLedger,
    ) -> Result<ChainReport, ChainAbort> {
        let mut report = ChainReport::default();

        for rule in &self.rules {
            let proceed = match rule.update_scores(decision, ledger).await {
                Ok(proceed) => proceed,
                Err(source) => {
                    warn!(rule = rule.name(), error = %source, "scoring rule failed, aborting chain");
                    return Err(ChainAbort {
                        rule: rule.name().to_string(),
                        source,
                    });
                }
            };
            report.executed.push(rule.name().to_string());

            if !proceed {
                debug!(rule = rule.name(), "scoring rule ended the chain");
                report.stopped_by = Some(rule.name().to_string());
                break;
            }
        }

        Ok(report)
    }
}

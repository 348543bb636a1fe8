//! Build result rule — prefer nodes where recent builds of the task went
//! well.
//!
//! Walks the newest `number_of_builds` records of the task's history. The
//! i-th record (0 = newest) adds `result_score * (scale + i * scale_adjust_for_older)`
//! to the node it ran on, if that node is being scored.

use gridscore_core::{BuildResult, ConfigResult, RuleSpec};

use crate::ledger::NodeScoreLedger;
use crate::rule::{Decision, RuleFuture, ScoringRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResultRule {
    pub number_of_builds: usize,
    pub scale: i64,
    pub scale_adjust_for_older: i64,
    pub success_score: i64,
    pub unstable_score: i64,
    pub failure_score: i64,
    pub other_score: i64,
}

impl Default for BuildResultRule {
    fn default() -> Self {
        Self {
            number_of_builds: 10,
            scale: 10,
            scale_adjust_for_older: -1,
            success_score: 100,
            unstable_score: 0,
            failure_score: -100,
            other_score: 0,
        }
    }
}

impl BuildResultRule {
    pub const KIND: &'static str = "build-result";
    pub const OPTIONS: &'static [&'static str] = &[
        "number_of_builds",
        "scale",
        "scale_adjust_for_older",
        "success_score",
        "unstable_score",
        "failure_score",
        "other_score",
    ];

    pub fn from_spec(spec: &RuleSpec) -> ConfigResult<Self> {
        spec.ensure_known(Self::OPTIONS)?;
        let d = Self::default();

        let number_of_builds = spec.int("number_of_builds", d.number_of_builds as i64)?;
        let number_of_builds =
            usize::try_from(number_of_builds).map_err(|_| gridscore_core::ConfigError::InvalidOption {
                rule: spec.kind.clone(),
                option: "number_of_builds".to_string(),
                reason: format!("must not be negative, got {number_of_builds}"),
            })?;

        Ok(Self {
            number_of_builds,
            scale: spec.int("scale", d.scale)?,
            scale_adjust_for_older: spec.int("scale_adjust_for_older", d.scale_adjust_for_older)?,
            success_score: spec.int("success_score", d.success_score)?,
            unstable_score: spec.int("unstable_score", d.unstable_score)?,
            failure_score: spec.int("failure_score", d.failure_score)?,
            other_score: spec.int("other_score", d.other_score)?,
        })
    }

    pub fn result_score(&self, result: BuildResult) -> i64 {
        match result {
            BuildResult::Success => self.success_score,
            BuildResult::Unstable => self.unstable_score,
            BuildResult::Failure => self.failure_score,
            BuildResult::Aborted | BuildResult::NotBuilt => self.other_score,
        }
    }
}

impl ScoringRule for BuildResultRule {
    fn name(&self) -> &str {
        Self::KIND
    }

    fn update_scores<'a>(
        &'a self,
        decision: &'a Decision<'a>,
        ledger: &'a mut NodeScoreLedger,
    ) -> RuleFuture<'a> {
        Box::pin(async move {
            let mut scale = self.scale;
            for record in decision.task.history.iter().take(self.number_of_builds) {
                if ledger.contains(&record.node) {
                    let raw = self.result_score(record.result);
                    let delta = raw.saturating_mul(scale);
                    decision.report(Self::KIND, &record.node, raw, delta);
                    ledger.add(&record.node, delta);
                }
                scale = scale.saturating_add(self.scale_adjust_for_older);
            }
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use gridscore_core::{Mapping, Node, Task, Worksheet};

    use super::*;
    use crate::sink::RecordingSink;

    async fn scores(rule: &BuildResultRule, task: &Task, ids: &[&str]) -> NodeScoreLedger {
        let mut worksheet = Worksheet::new(ids.iter().map(|id| Node::new(*id)).collect());
        worksheet.push_chunk(vec![], ids.iter().copied());
        let mapping = Mapping::for_worksheet(&worksheet);
        let sink = RecordingSink::new();
        let decision = Decision {
            task,
            chunk: &worksheet.chunks[0],
            mapping: &mapping,
            worksheet: &worksheet,
            sink: &sink,
        };
        let mut ledger = NodeScoreLedger::seeded(ids.iter().copied());
        assert!(rule.update_scores(&decision, &mut ledger).await.unwrap());
        ledger
    }

    #[tokio::test]
    async fn newer_builds_weigh_more() {
        let rule = BuildResultRule::default();
        let task = Task::new("job")
            .with_build("a", BuildResult::Success) // 100 * 10
            .with_build("b", BuildResult::Failure) // -100 * 9
            .with_build("a", BuildResult::Success); // 100 * 8
        let ledger = scores(&rule, &task, &["a", "b"]).await;

        assert_eq!(ledger.get("a"), 1_800);
        assert_eq!(ledger.get("b"), -900);
    }

    #[tokio::test]
    async fn only_scored_nodes_receive_points_but_age_still_counts() {
        let rule = BuildResultRule::default();
        let task = Task::new("job")
            .with_build("retired", BuildResult::Success)
            .with_build("a", BuildResult::Success);
        let ledger = scores(&rule, &task, &["a"]).await;

        assert_eq!(ledger.get("a"), 900);
        assert!(!ledger.contains("retired"));
    }

    #[tokio::test]
    async fn history_is_limited() {
        let rule = BuildResultRule {
            number_of_builds: 1,
            ..Default::default()
        };
        let task = Task::new("job")
            .with_build("a", BuildResult::Unstable)
            .with_build("a", BuildResult::Success);
        let ledger = scores(&rule, &task, &["a"]).await;

        assert_eq!(ledger.get("a"), 0);
    }

    #[test]
    fn other_results_use_other_score() {
        let rule = BuildResultRule {
            other_score: -7,
            ..Default::default()
        };
        assert_eq!(rule.result_score(BuildResult::Aborted), -7);
        assert_eq!(rule.result_score(BuildResult::NotBuilt), -7);
    }

    #[test]
    fn from_spec_rejects_negative_build_count() {
        let spec = RuleSpec::new(BuildResultRule::KIND).with_option("number_of_builds", -1);
        assert!(BuildResultRule::from_spec(&spec).is_err());

        let spec = RuleSpec::new(BuildResultRule::KIND).with_option("success_score", "50");
        assert_eq!(BuildResultRule::from_spec(&spec).unwrap().success_score, 50);
    }
}

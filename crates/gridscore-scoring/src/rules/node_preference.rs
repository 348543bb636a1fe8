//! Node preference rule — static node and project preferences.
//!
//! A node contributes `node.preference * nodes_preference_scale`, plus
//! `preference * project_preference_scale` for every label preference of
//! the task that the node carries.

use gridscore_core::{ConfigResult, Node, RuleSpec, Task};

use crate::ledger::NodeScoreLedger;
use crate::rule::{Decision, RuleFuture, ScoringRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePreferenceRule {
    nodes_preference_scale: i64,
    project_preference_scale: i64,
}

impl NodePreferenceRule {
    pub const KIND: &'static str = "node-preference";
    pub const OPTIONS: &'static [&'static str] =
        &["nodes_preference_scale", "project_preference_scale"];

    pub fn new(nodes_preference_scale: i64, project_preference_scale: i64) -> Self {
        Self {
            nodes_preference_scale,
            project_preference_scale,
        }
    }

    pub fn from_spec(spec: &RuleSpec) -> ConfigResult<Self> {
        spec.ensure_known(Self::OPTIONS)?;
        Ok(Self::new(
            spec.int("nodes_preference_scale", 10)?,
            spec.int("project_preference_scale", 10)?,
        ))
    }

    fn project_preference(task: &Task, node: &Node) -> i64 {
        task.preferences
            .iter()
            .filter(|p| node.has_label(&p.label))
            .fold(0i64, |acc, p| acc.saturating_add(p.preference))
    }

    fn delta(&self, task: &Task, node: &Node) -> (i64, i64) {
        let project = Self::project_preference(task, node);
        let raw = node.preference.saturating_add(project);
        let delta = node
            .preference
            .saturating_mul(self.nodes_preference_scale)
            .saturating_add(project.saturating_mul(self.project_preference_scale));
        (raw, delta)
    }
}

impl ScoringRule for NodePreferenceRule {
    fn name(&self) -> &str {
        Self::KIND
    }

    fn update_scores<'a>(
        &'a self,
        decision: &'a Decision<'a>,
        ledger: &'a mut NodeScoreLedger,
    ) -> RuleFuture<'a> {
        Box::pin(async move {
            let nodes: Vec<String> = ledger.nodes().map(str::to_string).collect();
            for id in &nodes {
                let Some(node) = decision.node(id) else { continue };
                let (raw, delta) = self.delta(decision.task, node);
                decision.report(Self::KIND, id, raw, delta);
                ledger.add(id, delta);
            }
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use gridscore_core::{Mapping, Worksheet};

    use super::*;
    use crate::sink::RecordingSink;

    async fn scores(rule: &NodePreferenceRule, task: &Task, nodes: Vec<Node>) -> NodeScoreLedger {
        let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let mut worksheet = Worksheet::new(nodes);
        worksheet.push_chunk(vec![], ids.clone());
        let mapping = Mapping::for_worksheet(&worksheet);
        let sink = RecordingSink::new();
        let decision = Decision {
            task,
            chunk: &worksheet.chunks[0],
            mapping: &mapping,
            worksheet: &worksheet,
            sink: &sink,
        };
        let mut ledger = NodeScoreLedger::seeded(ids);
        assert!(rule.update_scores(&decision, &mut ledger).await.unwrap());
        ledger
    }

    #[tokio::test]
    async fn node_preference_is_scaled() {
        let rule = NodePreferenceRule::new(10, 1);
        let task = Task::new("job");
        let ledger = scores(
            &rule,
            &task,
            vec![Node::new("a").with_preference(3), Node::new("b")],
        )
        .await;

        assert_eq!(ledger.get("a"), 30);
        assert_eq!(ledger.get("b"), 0);
    }

    #[tokio::test]
    async fn project_preferences_match_labels() {
        let rule = NodePreferenceRule::new(1, 5);
        let task = Task::new("job")
            .with_preference("linux", 2)
            .with_preference("gpu", 10)
            .with_preference("windows", -4);
        let ledger = scores(
            &rule,
            &task,
            vec![
                Node::new("a").with_labels(["linux", "gpu"]),
                Node::new("b").with_labels(["windows"]).with_preference(1),
                Node::new("c").with_labels(["arm"]),
            ],
        )
        .await;

        assert_eq!(ledger.get("a"), 60); // (2 + 10) * 5
        assert_eq!(ledger.get("b"), 1 - 20);
        assert_eq!(ledger.get("c"), 0);
    }

    #[test]
    fn from_spec_defaults_and_validation() {
        let rule = NodePreferenceRule::from_spec(&RuleSpec::new(NodePreferenceRule::KIND)).unwrap();
        assert_eq!(rule, NodePreferenceRule::new(10, 10));

        let bad = RuleSpec::new(NodePreferenceRule::KIND).with_option("nodes_preference_scale", 0.5);
        assert!(NodePreferenceRule::from_spec(&bad).is_err());
    }
}

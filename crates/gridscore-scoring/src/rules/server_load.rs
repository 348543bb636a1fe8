//! Server load rule — prefer nodes with idle cores.
//!
//! Each node scores `round(cores - load1)`, multiplied by `scale`. Nodes
//! whose metrics are unavailable score 0.

use futures_util::future::join_all;
use tracing::{debug, warn};

use gridscore_core::{ConfigResult, NodeId, RuleSpec};
use gridscore_probe::{MetricCollector, NodeMetrics, ProbeError};

use crate::ledger::NodeScoreLedger;
use crate::rule::{Decision, RuleFuture, ScoringRule};

#[derive(Debug, Clone)]
pub struct ServerLoadRule {
    scale: i64,
    /// Probe all nodes concurrently instead of one after another.
    parallel: bool,
    collector: MetricCollector,
}

impl ServerLoadRule {
    pub const KIND: &'static str = "server-load";
    pub const OPTIONS: &'static [&'static str] = &["scale", "parallel"];

    pub fn new(scale: i64, collector: MetricCollector) -> Self {
        Self {
            scale,
            parallel: true,
            collector,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn from_spec(spec: &RuleSpec, collector: &MetricCollector) -> ConfigResult<Self> {
        spec.ensure_known(Self::OPTIONS)?;
        Ok(Self::new(spec.int("scale", 1)?, collector.clone())
            .with_parallel(spec.bool("parallel", true)?))
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Unscaled score for one node's probe outcome.
    pub fn raw_score(metrics: &Result<NodeMetrics, ProbeError>) -> i64 {
        match metrics {
            Ok(m) => round_half_up(m.cores as f64 - m.load),
            Err(_) => 0,
        }
    }

    async fn probe(&self, decision: &Decision<'_>, id: &str) -> Result<NodeMetrics, ProbeError> {
        match decision.node(id) {
            Some(node) => self.collector.collect(node).await,
            None => Err(ProbeError::NoChannel(id.to_string())),
        }
    }
}

impl ScoringRule for ServerLoadRule {
    fn name(&self) -> &str {
        Self::KIND
    }

    fn update_scores<'a>(
        &'a self,
        decision: &'a Decision<'a>,
        ledger: &'a mut NodeScoreLedger,
    ) -> RuleFuture<'a> {
        Box::pin(async move {
            let nodes: Vec<NodeId> = ledger.nodes().map(str::to_string).collect();

            // Gather every probe before touching the ledger.
            let results = if self.parallel {
                join_all(nodes.iter().map(|id| self.probe(decision, id))).await
            } else {
                let mut results = Vec::with_capacity(nodes.len());
                for id in &nodes {
                    results.push(self.probe(decision, id).await);
                }
                results
            };

            for (id, result) in nodes.iter().zip(&results) {
                match result {
                    Err(e) if e.is_channel_fault() => {
                        warn!(node = %id, error = %e, "node channel failed, scoring node neutral");
                    }
                    Err(e) => debug!(node = %id, error = %e, "metrics unavailable, scoring node neutral"),
                    Ok(_) => {}
                }
                let score = Self::raw_score(result);
                let delta = score.saturating_mul(self.scale);
                decision.report(Self::KIND, id, score, delta);
                ledger.add(id, delta);
            }

            Ok(true)
        })
    }
}

/// Round to the nearest integer, halves toward positive infinity.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use gridscore_core::{ChannelError, Mapping, Node, Probe, Task, Worksheet};
    use gridscore_probe::StaticChannel;

    use super::*;
    use crate::sink::RecordingSink;

    fn linux(id: &str, load: &str, cores: &str) -> Node {
        Node::new(id).with_channel(Arc::new(
            StaticChannel::new()
                .with_load(format!("Result: {load} 0.40 0.30 1/123 456"))
                .with_cores(format!("{cores}\n")),
        ))
    }

    fn windows(id: &str) -> Node {
        Node::new(id).with_channel(Arc::new(
            StaticChannel::new().with_cores("'nproc' is not recognized as an internal command"),
        ))
    }

    async fn run_rule(rule: &ServerLoadRule, nodes: Vec<Node>) -> (NodeScoreLedger, RecordingSink) {
        let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let mut worksheet = Worksheet::new(nodes);
        worksheet.push_chunk(vec!["build".into()], ids.clone());
        let task = Task::new("job");
        let mapping = Mapping::for_worksheet(&worksheet);
        let sink = RecordingSink::new();
        let decision = Decision {
            task: &task,
            chunk: &worksheet.chunks[0],
            mapping: &mapping,
            worksheet: &worksheet,
            sink: &sink,
        };
        let mut ledger = NodeScoreLedger::seeded(ids);

        let proceed = rule.update_scores(&decision, &mut ledger).await.unwrap();
        assert!(proceed, "server load rule always lets later rules run");
        (ledger, sink)
    }

    fn collector() -> MetricCollector {
        MetricCollector::new(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn scores_idle_cores_times_scale() {
        let rule = ServerLoadRule::new(10, collector());
        let (ledger, sink) = run_rule(&rule, vec![linux("a", "0.50", "4")]).await;

        // round(4 - 0.50) * 10
        assert_eq!(ledger.get("a"), 40);
        assert_eq!(sink.events()[0].raw, 4);
        assert_eq!(sink.events()[0].delta, 40);
    }

    #[tokio::test]
    async fn unavailable_metrics_score_zero() {
        let rule = ServerLoadRule::new(1_000, collector());
        let (ledger, sink) = run_rule(&rule, vec![windows("b"), Node::new("no-channel")]).await;

        assert_eq!(ledger.get("b"), 0);
        assert_eq!(ledger.get("no-channel"), 0);
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn overloaded_node_scores_negative() {
        let rule = ServerLoadRule::new(2, collector());
        let (ledger, _) = run_rule(&rule, vec![linux("busy", "9.20", "4")]).await;

        // round(4 - 9.2) = round(-5.2) = -5
        assert_eq!(ledger.get("busy"), -10);
    }

    #[tokio::test]
    async fn channel_fault_is_neutral() {
        let node = Node::new("gone").with_channel(Arc::new(
            StaticChannel::new()
                .with_fault(Probe::LoadStatistics, ChannelError::Closed("eof".into()))
                .with_cores("8"),
        ));
        let rule = ServerLoadRule::new(10, collector());
        let (ledger, _) = run_rule(&rule, vec![node, linux("ok", "1.0", "2")]).await;

        assert_eq!(ledger.get("gone"), 0);
        assert_eq!(ledger.get("ok"), 10);
    }

    #[tokio::test]
    async fn broken_transport_is_reported_as_zero() {
        let node = Node::new("flaky").with_channel(Arc::new(
            StaticChannel::new()
                .with_load("Result: 0.10 0.10 0.10 1/10 99")
                .with_fault(Probe::CoreCount, ChannelError::Io("connection reset".into())),
        ));
        let rule = ServerLoadRule::new(10, collector());
        let (ledger, sink) = run_rule(&rule, vec![node]).await;

        assert_eq!(ledger.get("flaky"), 0);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].raw, events[0].delta), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_node_is_neutral() {
        let slow = Node::new("slow").with_channel(Arc::new(
            StaticChannel::new()
                .with_load("Result: 0.0 0.0 0.0")
                .with_cores("64")
                .with_delay(Duration::from_secs(120)),
        ));
        let rule = ServerLoadRule::new(1, MetricCollector::new(Duration::from_millis(50)));
        let (ledger, _) = run_rule(&rule, vec![slow]).await;

        assert_eq!(ledger.get("slow"), 0);
    }

    #[tokio::test]
    async fn sequential_probing_gives_same_scores() {
        let nodes = || vec![linux("a", "0.50", "4"), windows("b"), linux("c", "3.70", "2")];
        let parallel = ServerLoadRule::new(3, collector());
        let sequential = ServerLoadRule::new(3, collector()).with_parallel(false);

        let (p, _) = run_rule(&parallel, nodes()).await;
        let (s, _) = run_rule(&sequential, nodes()).await;
        for id in ["a", "b", "c"] {
            assert_eq!(p.get(id), s.get(id), "node {id}");
        }
        assert_eq!(s.get("c"), -6); // round(2 - 3.7) = -2
    }

    #[test]
    fn rounding_matches_half_up() {
        assert_eq!(round_half_up(3.5), 4);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-0.5), 0);
        assert_eq!(round_half_up(-1.5), -1);
        assert_eq!(round_half_up(-1.51), -2);
    }

    #[test]
    fn from_spec_reads_options() {
        let spec = RuleSpec::new(ServerLoadRule::KIND)
            .with_option("scale", 25)
            .with_option("parallel", false);
        let rule = ServerLoadRule::from_spec(&spec, &collector()).unwrap();
        assert_eq!(rule.scale(), 25);
        assert!(!rule.parallel);
    }

    #[test]
    fn from_spec_rejects_bad_scale() {
        let spec = RuleSpec::new(ServerLoadRule::KIND).with_option("scale", "lots");
        assert!(ServerLoadRule::from_spec(&spec, &collector()).is_err());
    }
}

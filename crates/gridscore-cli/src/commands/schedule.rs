//! `gridscore schedule` — run one scoring decision against the configured
//! nodes and print where each chunk would go.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use serde::Serialize;
use tracing::info;

use gridscore_core::{BuildResult, GridConfig, LabelPreference, Node, Task, Worksheet};
use gridscore_probe::{MetricCollector, node_from_spec};
use gridscore_scoring::{
    Placement, RecordingSink, RoundRobinFallback, RuleRegistry, ScoreEvent, ScoringLoadBalancer,
};

/// Task-level arguments of the `schedule` subcommand.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub task: String,
    pub chunks: usize,
    pub preferences: Vec<String>,
    pub builds: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Outcome {
    task: String,
    placement: Placement,
    scores: Vec<ScoreEvent>,
}

pub async fn schedule(path: &str, request: &Request, format: &str) -> anyhow::Result<()> {
    let config = GridConfig::from_file(Path::new(path))
        .with_context(|| format!("invalid config {path}"))?;
    let outcome = run(&config, request).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        _ => println!("{}", render(&outcome)),
    }
    Ok(())
}

async fn run(config: &GridConfig, request: &Request) -> anyhow::Result<Outcome> {
    if config.nodes.is_empty() {
        bail!("no [[nodes]] configured, nothing to schedule on");
    }

    let mut task = Task::new(request.task.clone());
    for raw in &request.preferences {
        let pref = parse_preference(raw)?;
        task = task.with_preference(pref.label, pref.preference);
    }
    for raw in &request.builds {
        let (node, result) = parse_build(raw)?;
        task = task.with_build(node, result);
    }

    let nodes: Vec<Node> = config
        .nodes
        .iter()
        .map(node_from_spec)
        .collect::<Result<_, _>>()?;
    let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut worksheet = Worksheet::new(nodes);
    for i in 0..request.chunks.max(1) {
        worksheet.push_chunk(vec![format!("{}#{i}", request.task)], ids.iter().cloned());
    }

    let registry = RuleRegistry::with_builtin(MetricCollector::new(config.probe.timeout()?));
    let sink = Arc::new(RecordingSink::new());
    let balancer =
        ScoringLoadBalancer::from_config(config, &registry, Arc::new(RoundRobinFallback::new()))?
            .with_sink(sink.clone());

    info!(
        task = %task.name,
        nodes = worksheet.nodes.len(),
        chunks = worksheet.chunks.len(),
        rules = balancer.chain().len(),
        "scheduling task"
    );
    let placement = balancer.map(&task, &worksheet).await;
    Ok(Outcome {
        task: task.name,
        placement,
        scores: sink.drain(),
    })
}

fn render(outcome: &Outcome) -> String {
    let mut out = format!("task {}\n", outcome.task);
    for event in &outcome.scores {
        out.push_str(&format!(
            "  {:<16} {:<20} raw {:>6}  {:+}\n",
            event.rule, event.node, event.raw, event.delta
        ));
    }

    let source = if outcome.placement.is_fallback() {
        "fallback"
    } else {
        "scoring"
    };
    match outcome.placement.mapping() {
        Some(mapping) => {
            out.push_str(&format!("placement ({source}):\n"));
            for (chunk, node) in mapping.iter() {
                out.push_str(&format!("  chunk {chunk} → {}\n", node.unwrap_or("-")));
            }
        }
        None => out.push_str(&format!("no placement ({source}): task stays queued\n")),
    }
    out.trim_end().to_string()
}

/// Parse `label=score`.
fn parse_preference(raw: &str) -> anyhow::Result<LabelPreference> {
    let (label, score) = raw
        .split_once('=')
        .with_context(|| format!("expected LABEL=SCORE, got {raw:?}"))?;
    let label = label.trim();
    if label.is_empty() {
        bail!("empty label in {raw:?}");
    }
    let preference = score
        .trim()
        .parse::<i64>()
        .with_context(|| format!("preference score must be an integer, got {score:?}"))?;
    Ok(LabelPreference {
        label: label.to_string(),
        preference,
    })
}

/// Parse `node=result`, e.g. `linux-a=failure`.
fn parse_build(raw: &str) -> anyhow::Result<(String, BuildResult)> {
    let (node, result) = raw
        .split_once('=')
        .with_context(|| format!("expected NODE=RESULT, got {raw:?}"))?;
    let result = match result.trim().to_ascii_lowercase().as_str() {
        "success" => BuildResult::Success,
        "unstable" => BuildResult::Unstable,
        "failure" => BuildResult::Failure,
        "aborted" => BuildResult::Aborted,
        "not_built" | "not-built" => BuildResult::NotBuilt,
        other => bail!("unknown build result {other:?}"),
    };
    Ok((node.trim().to_string(), result))
}

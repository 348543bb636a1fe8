//! gridscore-scoring — rule-based node scoring for build scheduling.
//!
//! Ranks candidate nodes for each work chunk with an ordered chain of
//! scoring rules, then places the chunk on the best-scoring node.
//!
//! # Architecture
//!
//! ```text
//! ScoringLoadBalancer::map(task, worksheet)
//!   └── per chunk, backtracking on dead ends:
//!       ├── NodeScoreLedger (fresh, seeded with feasible nodes at 0)
//!       ├── RuleChain::run
//!       │   ├── ServerLoadRule     → MetricCollector (per-node probes)
//!       │   ├── NodePreferenceRule
//!       │   └── BuildResultRule
//!       └── rank_of(feasible) → nodes to try, best first
//!   on ChainAbort → FallbackStrategy::map(task, worksheet)
//! ```
//!
//! # Components
//!
//! - **`ledger`** — per-decision additive score table
//! - **`rule`** — the `ScoringRule` contract and `Decision` context
//! - **`rules`** — built-in rules
//! - **`chain`** — ordered rule runner with short-circuit and abort
//! - **`balancer`** — `ScoringLoadBalancer`, selection and fallback
//! - **`fallback`** — fallback strategy contract and round-robin default
//! - **`registry`** — rule kinds → constructors, option validation
//! - **`sink`** — per-node score events

pub mod balancer;
pub mod chain;
pub mod error;
pub mod fallback;
pub mod ledger;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod sink;

pub use balancer::{Placement, ScoringLoadBalancer};
pub use chain::{ChainReport, RuleChain};
pub use error::{ChainAbort, RuleFailure, RuleResult};
pub use fallback::{FallbackStrategy, RoundRobinFallback};
pub use ledger::NodeScoreLedger;
pub use registry::{RuleFactory, RuleRegistry};
pub use rule::{Decision, RuleFuture, ScoringRule};
pub use rules::{BuildResultRule, NodePreferenceRule, ServerLoadRule};
pub use sink::{RecordingSink, ScoreEvent, ScoreSink, TracingSink};

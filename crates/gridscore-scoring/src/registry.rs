//! Rule registry — maps rule kinds from configuration to constructors.
//!
//! Options are validated when a rule is built, so a bad configuration is
//! rejected before any scheduling happens.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use gridscore_core::{ConfigError, ConfigResult, RuleSpec};
use gridscore_probe::MetricCollector;

use crate::chain::RuleChain;
use crate::rule::ScoringRule;
use crate::rules::{BuildResultRule, NodePreferenceRule, ServerLoadRule};

/// Constructor for one rule kind.
pub type RuleFactory = Box<dyn Fn(&RuleSpec) -> ConfigResult<Arc<dyn ScoringRule>> + Send + Sync>;

/// Table of known rule kinds.
#[derive(Default)]
pub struct RuleRegistry {
    factories: BTreeMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in rules. Rules that probe nodes use
    /// `collector`.
    pub fn with_builtin(collector: MetricCollector) -> Self {
        let mut registry = Self::new();
        registry.register(ServerLoadRule::KIND, move |spec| {
            Ok(Arc::new(ServerLoadRule::from_spec(spec, &collector)?))
        });
        registry.register(NodePreferenceRule::KIND, |spec| {
            Ok(Arc::new(NodePreferenceRule::from_spec(spec)?))
        });
        registry.register(BuildResultRule::KIND, |spec| {
            Ok(Arc::new(BuildResultRule::from_spec(spec)?))
        });
        registry
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&RuleSpec) -> ConfigResult<Arc<dyn ScoringRule>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, spec: &RuleSpec) -> ConfigResult<Arc<dyn ScoringRule>> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| ConfigError::UnknownRule(spec.kind.clone()))?;
        factory(spec)
    }

    /// Build all rules, keeping their configured order.
    pub fn build_chain(&self, specs: &[RuleSpec]) -> ConfigResult<RuleChain> {
        let mut chain = RuleChain::new();
        for spec in specs {
            chain.push(self.build(spec)?);
            debug!(rule = %spec.kind, position = chain.len(), "scoring rule configured");
        }
        Ok(chain)
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("kinds", &self.kinds().collect::<Vec<_>>())
            .finish()
    }
}

//! gridscore.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Node;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub balancer: BalancerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Scoring rules, applied in the order they appear.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// When false every scheduling call goes straight to the fallback.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log the full score table after every decision.
    #[serde(default)]
    pub report_scores: bool,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            report_scores: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-probe timeout, e.g. "5s" or "500ms".
    #[serde(default = "default_probe_timeout")]
    pub timeout: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_probe_timeout(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> ConfigResult<Duration> {
        parse_duration(&self.timeout)
    }
}

/// A scoring rule entry: its kind plus named options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub kind: String,
    #[serde(flatten)]
    pub options: toml::Table,
}

impl RuleSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: toml::Table::new(),
        }
    }

    pub fn with_option(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self
    }

    /// Reject options not in `known`.
    pub fn ensure_known(&self, known: &[&str]) -> ConfigResult<()> {
        match self.options.keys().find(|k| !known.contains(&k.as_str())) {
            Some(option) => Err(ConfigError::UnknownOption {
                rule: self.kind.clone(),
                option: option.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Read an integer option. Integers written as strings ("10") are
    /// accepted; anything else that is not a whole number is rejected.
    pub fn int(&self, option: &str, default: i64) -> ConfigResult<i64> {
        let invalid = |reason: &str| ConfigError::InvalidOption {
            rule: self.kind.clone(),
            option: option.to_string(),
            reason: reason.to_string(),
        };
        match self.options.get(option) {
            None => Ok(default),
            Some(toml::Value::Integer(v)) => Ok(*v),
            Some(toml::Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| invalid(&format!("is not an integer: {s:?}"))),
            Some(other) => Err(invalid(&format!("must be an integer, got {}", other.type_str()))),
        }
    }

    pub fn bool(&self, option: &str, default: bool) -> ConfigResult<bool> {
        match self.options.get(option) {
            None => Ok(default),
            Some(toml::Value::Boolean(v)) => Ok(*v),
            Some(other) => Err(ConfigError::InvalidOption {
                rule: self.kind.clone(),
                option: option.to_string(),
                reason: format!("must be a boolean, got {}", other.type_str()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default = "default_executors")]
    pub executors: u32,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub preference: i64,
    /// How to reach the node for metric probes. Absent = no channel.
    pub probe: Option<ProbeSpec>,
}

impl NodeSpec {
    /// Build a node without a channel; callers attach one from `probe`.
    pub fn to_node(&self) -> Node {
        Node::new(self.id.clone())
            .with_labels(self.labels.iter().cloned())
            .with_executors(self.executors)
            .with_preference(self.preference)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeSpec {
    /// `probe = "local"`: probe the machine gridscore runs on.
    Mode(ProbeMode),
    /// Fixed probe responses; a missing entry means "unsupported".
    Static {
        load: Option<String>,
        cores: Option<String>,
        /// Artificial response delay, e.g. "2s".
        delay: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    Local,
}

impl GridConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: GridConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not depend on the rule registry.
    pub fn validate(&self) -> ConfigResult<()> {
        self.probe.timeout()?;

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(ConfigError::DuplicateNode(node.id.clone()));
            }
            if node.executors == 0 {
                return Err(ConfigError::NoExecutors(node.id.clone()));
            }
            if let Some(ProbeSpec::Static {
                delay: Some(delay), ..
            }) = &node.probe
            {
                parse_duration(delay)?;
            }
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m" or bare seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let raw = s.trim();
    let parsed = if let Some(ms) = raw.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = raw.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = raw.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        raw.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.ok_or_else(|| ConfigError::InvalidDuration(s.to_string()))
}

fn default_true() -> bool {
    true
}

fn default_probe_timeout() -> String {
    "5s".to_string()
}

fn default_executors() -> u32 {
    1
}

use std::path::Path;

use anyhow::Context;
use gridscore_core::GridConfig;
use gridscore_probe::MetricCollector;
use gridscore_scoring::RuleRegistry;
use tracing::debug;

pub fn check(path: &str) -> anyhow::Result<()> {
    for line in describe(Path::new(path))? {
        println!("{line}");
    }
    Ok(())
}

/// Load and fully validate a config, returning a human-readable summary.
fn describe(path: &Path) -> anyhow::Result<Vec<String>> {
    let config = GridConfig::from_file(path)
        .with_context(|| format!("invalid config {}", path.display()))?;
    let collector = MetricCollector::new(config.probe.timeout()?);
    let chain = RuleRegistry::with_builtin(collector).build_chain(&config.rules)?;
    debug!(path = %path.display(), rules = chain.len(), nodes = config.nodes.len(), "config validated");

    let mut lines = vec![format!("✓ {} is valid", path.display())];
    if !config.balancer.enabled {
        lines.push("  balancer disabled: every task uses the fallback".to_string());
    }
    if chain.is_empty() {
        lines.push("  no scoring rules: the first feasible node always wins".to_string());
    }
    for (i, name) in chain.names().enumerate() {
        lines.push(format!("  {}. {name}", i + 1));
    }
    lines.push(format!("  {} node(s) configured", config.nodes.len()));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_config(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gridscore.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_describe_lists_rules_in_order() {
        let (_dir, path) = write_config(
            r#"
[[rules]]
kind = "build-result"

[[rules]]
kind = "server-load"
scale = 10

[[nodes]]
id = "a"
"#,
        );
        let lines = describe(&path).unwrap();
        assert_eq!(lines[1], "  1. build-result");
        assert_eq!(lines[2], "  2. server-load");
        assert_eq!(lines[3], "  1 node(s) configured");
    }

    #[test]
    fn test_describe_rejects_unknown_rule() {
        let (_dir, path) = write_config("[[rules]]\nkind = \"weather\"\n");
        let err = describe(&path).unwrap_err();
        assert!(err.to_string().contains("weather"));
    }

    #[test]
    fn test_describe_rejects_non_integer_scale() {
        let (_dir, path) = write_config("[[rules]]\nkind = \"server-load\"\nscale = \"ten\"\n");
        assert!(describe(&path).is_err());
    }

    #[test]
    fn test_describe_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(describe(&dir.path().join("nope.toml")).is_err());
    }
}

//! Tool configuration (TOML) and specification file loading.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::io::git::DEFAULT_GIT;
use crate::io::process::SystemRunner;

/// Tool configuration.
///
/// Missing fields default to values that match a plain `git` on `PATH`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    /// Git executable used when the specification does not override it.
    pub git_command: String,

    /// Kill a single git invocation after this many seconds; 0 disables the limit.
    pub timeout_secs: u64,

    /// Bytes of stdout/stderr kept per invocation.
    pub output_limit_bytes: usize,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            git_command: DEFAULT_GIT.to_string(),
            timeout_secs: 0,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl ToolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.git_command.trim().is_empty() {
            return Err(anyhow!("git_command must not be empty"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn runner(&self) -> SystemRunner {
        SystemRunner {
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ToolConfig::default()`.
pub fn load_config(path: &Path) -> Result<ToolConfig> {
    if !path.exists() {
        let cfg = ToolConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ToolConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load a specification file as a nested value.
///
/// `.json` files are parsed as JSON; anything else as TOML.
pub fn load_spec(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_spec(&contents, path.extension().is_some_and(|ext| ext == "json"))
        .with_context(|| format!("parse {}", path.display()))
}

fn parse_spec(contents: &str, json: bool) -> Result<Value> {
    if json {
        return serde_json::from_str(contents).context("parse json");
    }
    let table: toml::Table = toml::from_str(contents).context("parse toml")?;
    serde_json::to_value(table).context("convert toml to json value")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ToolConfig::default());
        assert_eq!(cfg.runner().timeout, None);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "timeout_secs = 30\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.git_command, "git");
        assert_eq!(cfg.runner().timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn empty_git_command_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "git_command = \"  \"\n").expect("write");
        let err = load_config(&path).expect_err("should fail");
        assert!(err.to_string().contains("git_command"));
    }

    #[test]
    fn toml_spec_becomes_nested_value() {
        let value = parse_spec(
            "branch = \"release\"\n[ensure]\nchecked_out = true\npull = [{ from = \"main\", rebase = true }, true]\n",
            false,
        )
        .expect("parse");
        assert_eq!(
            value,
            json!({
                "branch": "release",
                "ensure": {
                    "checked_out": true,
                    "pull": [{"from": "main", "rebase": true}, true]
                }
            })
        );
    }

    #[test]
    fn json_spec_is_read_by_extension() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("goal.json");
        fs::write(&path, r#"{"verify": {"committed": true}}"#).expect("write");
        let value = load_spec(&path).expect("load");
        assert_eq!(value, json!({"verify": {"committed": true}}));
    }
}

//! Closed-world decoder from a nested specification to declared postconditions.
//!
//! Input shape (shown as TOML):
//!
//! ```toml
//! branch = "release"
//! repository = "/srv/app"
//! git_command = "git"
//!
//! [ensure]
//! checked_out = true
//! committed = { message = "nightly snapshot" }
//! pull = [{ from = "main", rebase = true }, true]
//! push = { force_with_lease = true }
//! ```
//!
//! Exactly one of `verify` / `ensure` is required. Unknown keys at any level
//! are rejected. Postconditions come out in gate order: checked out,
//! committed, pulled, pushed.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::core::failure::Failure;
use crate::core::types::Mode;

const TOP_KEYS: &[&str] = &["verify", "ensure", "branch", "repository", "git_command"];
const GOAL_KEYS: &[&str] = &["checked_out", "committed", "pull", "push"];
const COMMITTED_KEYS: &[&str] = &["message"];
const PULL_KEYS: &[&str] = &["from", "rebase", "autostash"];
const PUSH_KEYS: &[&str] = &["to", "force", "force_with_lease"];

/// Options for a pull postcondition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Local branch whose upstream is pulled; `None` falls back to the
    /// declared branch, then the current one.
    pub from: Option<String>,
    pub rebase: bool,
    pub autostash: bool,
}

/// Options for a push postcondition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Local branch whose upstream receives the push.
    pub to: Option<String>,
    pub force: bool,
    pub force_with_lease: bool,
}

/// Which git concern a postcondition covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    CheckedOut,
    Committed { message: Option<String> },
    Pulled(PullOptions),
    Pushed(PushOptions),
}

/// One decoded goal, with the call-wide settings applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declared {
    pub mode: Mode,
    pub repository: PathBuf,
    pub branch: Option<String>,
    pub git_command: Option<String>,
    pub kind: Kind,
}

impl Declared {
    /// Human description used in reports and errors.
    pub fn explainer(&self) -> String {
        let branch = match &self.branch {
            Some(name) => format!("branch `{name}`"),
            None => "current branch".to_string(),
        };
        match &self.kind {
            Kind::CheckedOut => match &self.branch {
                Some(name) => format!("branch `{name}` is checked out"),
                None => "a branch is checked out".to_string(),
            },
            Kind::Committed { .. } => format!("{branch} has no uncommitted changes"),
            Kind::Pulled(opts) => {
                let source = opts
                    .from
                    .as_deref()
                    .map(|from| format!("branch `{from}`"))
                    .unwrap_or(branch);
                let how = if opts.rebase { " (rebase)" } else { "" };
                format!("{source} is pulled from its upstream{how}")
            }
            Kind::Pushed(opts) => {
                let target = opts
                    .to
                    .as_deref()
                    .map(|to| format!("branch `{to}`"))
                    .unwrap_or(branch);
                format!("{target} is pushed to its upstream")
            }
        }
    }
}

/// Decode a specification into postconditions, in evaluation order.
pub fn decode(spec: &Value) -> Result<Vec<Declared>, Failure> {
    let top = as_mapping(spec, "specification")?;
    reject_unknown(top, TOP_KEYS, "specification")?;

    let (mode, body) = match (present(top, "verify"), present(top, "ensure")) {
        (Some(_), Some(_)) => {
            return Err(Failure::Config(
                "`verify` and `ensure` are mutually exclusive".to_string(),
            ));
        }
        (Some(body), None) => (Mode::Verify, body),
        (None, Some(body)) => (Mode::Ensure, body),
        (None, None) => {
            return Err(Failure::Config(
                "one of `verify` or `ensure` is required".to_string(),
            ));
        }
    };

    let branch = optional_string(top, "branch", "branch")?;
    let repository = optional_string(top, "repository", "repository")?
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let git_command = optional_string(top, "git_command", "git_command")?;
    if git_command.as_deref().is_some_and(|cmd| cmd.trim().is_empty()) {
        return Err(Failure::Config("git_command must not be empty".to_string()));
    }

    let section = mode.as_str();
    let goals = as_mapping(body, section)?;
    reject_unknown(goals, GOAL_KEYS, section)?;

    let mut kinds = Vec::new();
    if optional_bool(goals, "checked_out", &format!("{section}.checked_out"))? {
        kinds.push(Kind::CheckedOut);
    }
    if let Some(value) = present(goals, "committed")
        && let Some(kind) = decode_committed(value, &format!("{section}.committed"))?
    {
        kinds.push(kind);
    }
    if let Some(value) = present(goals, "pull") {
        decode_pulls(value, &format!("{section}.pull"), &mut kinds)?;
    }
    if let Some(value) = present(goals, "push")
        && let Some(kind) = decode_push(value, &format!("{section}.push"))?
    {
        kinds.push(kind);
    }

    Ok(kinds
        .into_iter()
        .map(|kind| Declared {
            mode,
            repository: repository.clone(),
            branch: branch.clone(),
            git_command: git_command.clone(),
            kind,
        })
        .collect())
}

fn decode_committed(value: &Value, path: &str) -> Result<Option<Kind>, Failure> {
    match value {
        Value::Bool(true) => Ok(Some(Kind::Committed { message: None })),
        Value::Bool(false) => Ok(None),
        Value::Object(map) => {
            reject_unknown(map, COMMITTED_KEYS, path)?;
            let message = optional_string(map, "message", &format!("{path}.message"))?;
            Ok(Some(Kind::Committed { message }))
        }
        _ => Err(wrong_type(path, "`true` or a mapping")),
    }
}

fn decode_pulls(value: &Value, path: &str, kinds: &mut Vec<Kind>) -> Result<(), Failure> {
    match value {
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{idx}]");
                if matches!(item, Value::Array(_)) {
                    return Err(wrong_type(&item_path, "`true` or a mapping"));
                }
                if let Some(kind) = decode_pull(item, &item_path)? {
                    kinds.push(kind);
                }
            }
            Ok(())
        }
        other => {
            if let Some(kind) = decode_pull(other, path)? {
                kinds.push(kind);
            }
            Ok(())
        }
    }
}

fn decode_pull(value: &Value, path: &str) -> Result<Option<Kind>, Failure> {
    match value {
        Value::Bool(true) => Ok(Some(Kind::Pulled(PullOptions::default()))),
        Value::Bool(false) => Ok(None),
        Value::Object(map) => {
            reject_unknown(map, PULL_KEYS, path)?;
            Ok(Some(Kind::Pulled(PullOptions {
                from: optional_string(map, "from", &format!("{path}.from"))?,
                rebase: optional_bool(map, "rebase", &format!("{path}.rebase"))?,
                autostash: optional_bool(map, "autostash", &format!("{path}.autostash"))?,
            })))
        }
        _ => Err(wrong_type(path, "`true`, a mapping or a list")),
    }
}

fn decode_push(value: &Value, path: &str) -> Result<Option<Kind>, Failure> {
    match value {
        Value::Bool(true) => Ok(Some(Kind::Pushed(PushOptions::default()))),
        Value::Bool(false) => Ok(None),
        Value::Object(map) => {
            reject_unknown(map, PUSH_KEYS, path)?;
            Ok(Some(Kind::Pushed(PushOptions {
                to: optional_string(map, "to", &format!("{path}.to"))?,
                force: optional_bool(map, "force", &format!("{path}.force"))?,
                force_with_lease: optional_bool(
                    map,
                    "force_with_lease",
                    &format!("{path}.force_with_lease"),
                )?,
            })))
        }
        _ => Err(wrong_type(path, "`true` or a mapping")),
    }
}

fn as_mapping<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, Failure> {
    value
        .as_object()
        .ok_or_else(|| wrong_type(path, "a mapping"))
}

/// Look up a key, treating an explicit null as absent.
fn present<'v>(map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    map.get(key).filter(|value| !value.is_null())
}

fn reject_unknown(map: &Map<String, Value>, allowed: &[&str], path: &str) -> Result<(), Failure> {
    let mut unknown: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| !allowed.contains(key))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(Failure::Config(format!(
        "unknown keys in {path}: {}",
        unknown.join(", ")
    )))
}

fn optional_string(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<String>, Failure> {
    match present(map, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(wrong_type(path, "a string")),
    }
}

fn optional_bool(map: &Map<String, Value>, key: &str, path: &str) -> Result<bool, Failure> {
    match present(map, key) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(wrong_type(path, "a boolean")),
    }
}

fn wrong_type(path: &str, expected: &str) -> Failure {
    Failure::Config(format!("{path} must be {expected}"))
}

//! Shared types for the postcondition engine.
//!
//! These types define stable contracts between the decoder, the driving loop
//! and the command layer. They carry no I/O and never change after creation.

use serde::Serialize;

/// Whether an unmet postcondition is only reported or also fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Assert only; an unmet postcondition fails the evaluation.
    Verify,
    /// Assert, and enforce unmet postconditions unless vetoed.
    Ensure,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Verify => "verify",
            Mode::Ensure => "ensure",
        }
    }
}

/// Normalized outcome of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Transcript entry for a command issued on behalf of a postcondition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRecord {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Remote-tracking branch configured for a local branch.
///
/// "No upstream configured" is `Option::<Upstream>::None`, so the pair is
/// never partially absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub remote: String,
    pub branch: String,
}

impl Upstream {
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    /// Remote-tracking ref for this upstream, e.g. `refs/remotes/origin/main`.
    pub fn tracking_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.remote, self.branch)
    }
}

/// How a single postcondition ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// `holds()` was already true; nothing ran.
    Satisfied,
    /// `enforce()` ran mutating commands.
    Enforced,
    /// Dry run: `enforce()` would have run.
    WouldEnforce,
    /// The evaluation stopped at this postcondition.
    Failed,
}

impl OutcomeStatus {
    pub fn is_change(self) -> bool {
        matches!(self, OutcomeStatus::Enforced | OutcomeStatus::WouldEnforce)
    }
}

/// Per-postcondition entry of the aggregate result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub explainer: String,
    pub status: OutcomeStatus,
    pub commands: Vec<CommandRecord>,
}

/// Aggregate result returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub changed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub outcomes: Vec<Outcome>,
}

impl Report {
    /// Record a finished postcondition; changes flip `changed`.
    pub fn record(&mut self, outcome: Outcome) {
        if outcome.status.is_change() {
            self.changed = true;
        }
        self.outcomes.push(outcome);
    }

    /// Mark the whole evaluation failed. Earlier changes stay reported.
    pub fn fail(&mut self, kind: &'static str, msg: impl Into<String>) {
        self.failed = true;
        self.kind = Some(kind);
        self.msg = Some(msg.into());
    }

    /// Every command issued during the evaluation, in order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandRecord> {
        self.outcomes.iter().flat_map(|outcome| outcome.commands.iter())
    }
}

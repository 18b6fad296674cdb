//! Failure taxonomy for postcondition evaluation.
//!
//! Every variant is fatal for the remaining sequence. `kind()` gives the
//! stable tag reported alongside the message.

/// Reasons an evaluation stops.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// Malformed or contradictory specification; raised before any command runs.
    #[error("invalid specification: {0}")]
    Config(String),

    /// A fix exists in principle but is withheld.
    #[error("{explainer}: declined to enforce: {reason}")]
    Declined { explainer: String, reason: String },

    /// Verify mode found the postcondition false.
    #[error("{explainer}: does not hold")]
    Unverified { explainer: String },

    /// Push or pull needs a tracking branch and none is configured.
    #[error("no upstream configured for {target}")]
    NoUpstream { target: String },

    /// A command exited outside its acceptable set.
    #[error("`{command}` failed with exit code {exit_code}: {stderr}")]
    Tool {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The command could not be started at all.
    #[error("{0:#}")]
    Spawn(anyhow::Error),
}

impl Failure {
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Config(_) => "config",
            Failure::Declined { .. } => "declined",
            Failure::Unverified { .. } => "unverified",
            Failure::NoUpstream { .. } => "no_upstream",
            Failure::Tool { .. } => "tool",
            Failure::Spawn(_) => "spawn",
        }
    }

    /// True for failures coming from the command layer rather than from
    /// postcondition logic.
    pub fn is_tool_error(&self) -> bool {
        matches!(self, Failure::Tool { .. } | Failure::Spawn(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declined_message_names_postcondition_and_reason() {
        let failure = Failure::Declined {
            explainer: "branch is committed".to_string(),
            reason: "no commit message".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "branch is committed: declined to enforce: no commit message"
        );
        assert_eq!(failure.kind(), "declined");
        assert!(!failure.is_tool_error());
    }

    #[test]
    fn tool_failure_surfaces_stderr() {
        let failure = Failure::Tool {
            command: "git diff --quiet".to_string(),
            exit_code: 128,
            stderr: "fatal: not a git repository".to_string(),
        };
        assert!(failure.to_string().contains("fatal: not a git repository"));
        assert!(failure.is_tool_error());
    }
}

//! Orchestration: decode a specification, build its postconditions, evaluate them.

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::postcondition::{Postcondition, evaluate};
use crate::core::spec::decode;
use crate::core::types::Report;
use crate::io::process::CommandRunner;
use crate::postconditions::build;

/// Evaluate `spec` against its repository.
///
/// `check` forbids mutation: unmet ensure postconditions are reported as
/// `would_enforce`. `default_git` is used when the specification carries no
/// `git_command`. Configuration errors come back as a failed report before
/// any command runs.
#[instrument(skip_all, fields(check))]
pub fn apply(
    spec: &Value,
    check: bool,
    default_git: Option<&str>,
    runner: &dyn CommandRunner,
) -> Report {
    let declared = match decode(spec) {
        Ok(declared) => declared,
        Err(failure) => {
            warn!(%failure, "rejecting specification");
            let mut report = Report::default();
            report.fail(failure.kind(), failure.to_string());
            return report;
        }
    };
    info!(count = declared.len(), "evaluating postconditions");

    let postconditions: Vec<Box<dyn Postcondition + '_>> = declared
        .into_iter()
        .map(|declared| build(declared, check, default_git, runner))
        .collect();
    evaluate(postconditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::OutcomeStatus;
    use crate::test_support::ScriptedRunner;
    use serde_json::json;

    #[test]
    fn config_errors_run_no_commands() {
        let runner = ScriptedRunner::new();
        let report = apply(
            &json!({"verify": {"checked_out": true}, "ensure": {"checked_out": true}}),
            false,
            None,
            &runner,
        );
        assert!(report.failed);
        assert_eq!(report.kind, Some("config"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn verify_mode_never_mutates() {
        let runner = ScriptedRunner::new()
            .on("git branch --show-current", 0, "main\n", "")
            .on("git diff --quiet", 1, "", "");
        let report = apply(
            &json!({"verify": {"checked_out": true, "committed": {"message": "m"}}, "branch": "release"}),
            false,
            None,
            &runner,
        );
        assert!(report.failed);
        assert!(!report.changed);
        assert_eq!(report.kind, Some("unverified"));
        assert_eq!(runner.calls(), vec!["git branch --show-current"]);
    }

    #[test]
    fn check_mode_reports_without_mutating() {
        let runner = ScriptedRunner::new()
            .on("git branch --show-current", 0, "main\n", "")
            .on("git diff --quiet", 0, "", "")
            .on("git diff --cached --quiet", 1, "", "");
        let report = apply(
            &json!({"ensure": {"checked_out": true, "committed": {"message": "m"}}, "branch": "release"}),
            true,
            None,
            &runner,
        );
        assert!(!report.failed);
        assert!(report.changed);
        let statuses: Vec<OutcomeStatus> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![OutcomeStatus::WouldEnforce, OutcomeStatus::WouldEnforce]
        );
        assert!(
            !runner
                .calls()
                .iter()
                .any(|call| call.contains("checkout") || call.contains("commit"))
        );
    }

    #[test]
    fn spec_git_command_overrides_default() {
        let runner = ScriptedRunner::new().on("/opt/git branch --show-current", 0, "main\n", "");
        let report = apply(
            &json!({"verify": {"checked_out": true}, "git_command": "/opt/git"}),
            false,
            Some("git-wrapper"),
            &runner,
        );
        assert!(!report.failed);
        assert_eq!(report.outcomes[0].status, OutcomeStatus::Satisfied);
    }

    #[test]
    fn default_git_applies_without_override() {
        let runner =
            ScriptedRunner::new().on("git-wrapper branch --show-current", 0, "main\n", "");
        let report = apply(
            &json!({"verify": {"checked_out": true}}),
            false,
            Some("git-wrapper"),
            &runner,
        );
        assert!(!report.failed);
    }
}

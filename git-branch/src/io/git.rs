//! Git command adapter.
//!
//! Turns git arguments into invocations for one working copy, runs them
//! through a [`CommandRunner`], and classifies exit codes. Queries may
//! declare which exit codes are answers rather than failures; changes
//! accept only zero.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, instrument, warn};

use crate::core::failure::Failure;
use crate::core::types::{CommandRecord, CommandResult};
use crate::io::process::{CommandRunner, Invocation, Program};

/// Executable used when no override is configured.
pub const DEFAULT_GIT: &str = "git";

/// A standalone `git` word in a shell command line.
static GIT_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s(;|&])git(\s|$)").expect("git word pattern is valid")
});

/// Wrapper for executing git commands in a working copy.
pub struct Git<'a> {
    workdir: PathBuf,
    command: String,
    runner: &'a dyn CommandRunner,
    transcript: RefCell<Vec<CommandRecord>>,
}

impl<'a> Git<'a> {
    pub fn new(
        workdir: impl Into<PathBuf>,
        command: Option<&str>,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            command: command.unwrap_or(DEFAULT_GIT).to_string(),
            runner,
            transcript: RefCell::new(Vec::new()),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Build the invocation for `args`.
    ///
    /// A single argument containing a space is a shell command line in which
    /// every standalone `git` is replaced by the configured executable.
    /// Anything else runs as argv, prefixed by the configured executable.
    pub fn invocation(&self, args: &[&str]) -> Invocation {
        let program = match args {
            [line] if line.contains(' ') => Program::Shell(self.substitute(line)),
            _ => {
                let mut argv: Vec<String> =
                    self.command.split_whitespace().map(str::to_string).collect();
                argv.extend(args.iter().map(|arg| arg.to_string()));
                Program::Argv(argv)
            }
        };
        Invocation {
            workdir: self.workdir.clone(),
            program,
        }
    }

    /// Run a non-mutating command.
    ///
    /// With `expected` set, an exit code outside it is a tool failure;
    /// without it the result is returned whatever the exit code.
    pub fn query(&self, args: &[&str], expected: Option<&[i32]>) -> Result<CommandResult, Failure> {
        let (invocation, result) = self.execute(args)?;
        if let Some(codes) = expected
            && !codes.contains(&result.exit_code)
        {
            return Err(tool_failure(&invocation, &result));
        }
        Ok(result)
    }

    /// Run a mutating command; any non-zero exit code is a tool failure.
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    pub fn change(&self, args: &[&str]) -> Result<CommandResult, Failure> {
        let (invocation, result) = self.execute(args)?;
        if !result.success() {
            return Err(tool_failure(&invocation, &result));
        }
        Ok(result)
    }

    /// Tool failure for a result the caller could not interpret.
    pub fn failure(&self, args: &[&str], result: &CommandResult) -> Failure {
        tool_failure(&self.invocation(args), result)
    }

    /// Commands run so far, in order.
    pub fn transcript(&self) -> Vec<CommandRecord> {
        self.transcript.borrow().clone()
    }

    fn execute(&self, args: &[&str]) -> Result<(Invocation, CommandResult), Failure> {
        let invocation = self.invocation(args);
        let result = self.runner.run(&invocation).map_err(Failure::Spawn)?;
        debug!(command = %invocation, exit_code = result.exit_code, "git command finished");
        self.transcript.borrow_mut().push(CommandRecord {
            command: invocation.to_string(),
            exit_code: result.exit_code,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
        });
        Ok((invocation, result))
    }

    fn substitute(&self, line: &str) -> String {
        if self.command == DEFAULT_GIT {
            return line.to_string();
        }
        GIT_WORD
            .replace_all(line, |caps: &Captures| {
                format!("{}{}{}", &caps[1], self.command, &caps[2])
            })
            .into_owned()
    }
}

fn tool_failure(invocation: &Invocation, result: &CommandResult) -> Failure {
    warn!(command = %invocation, exit_code = result.exit_code, "git command failed");
    Failure::Tool {
        command: invocation.to_string(),
        exit_code: result.exit_code,
        stderr: result.stderr.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;

    #[test]
    fn argv_invocation_uses_configured_command() {
        let runner = ScriptedRunner::new();
        let git = Git::new("/repo", Some("/opt/git/bin/git"), &runner);
        let invocation = git.invocation(&["commit", "-a", "-m", "two words"]);
        assert_eq!(invocation.workdir, PathBuf::from("/repo"));
        assert_eq!(
            invocation.program,
            Program::Argv(vec![
                "/opt/git/bin/git".to_string(),
                "commit".to_string(),
                "-a".to_string(),
                "-m".to_string(),
                "two words".to_string(),
            ])
        );
    }

    #[test]
    fn wrapper_commands_are_split_for_argv() {
        let runner = ScriptedRunner::new();
        let git = Git::new("/repo", Some("sudo -u deploy git"), &runner);
        let invocation = git.invocation(&["status"]);
        assert_eq!(invocation.to_string(), "sudo -u deploy git status");
    }

    #[test]
    fn single_argument_with_space_runs_in_shell() {
        let runner = ScriptedRunner::new();
        let git = Git::new("/repo", None, &runner);
        let invocation = git.invocation(&["git remote | sort"]);
        assert_eq!(
            invocation.program,
            Program::Shell("git remote | sort".to_string())
        );
    }

    #[test]
    fn shell_lines_substitute_standalone_git_words() {
        let runner = ScriptedRunner::new();
        let git = Git::new("/repo", Some("hub"), &runner);
        let invocation = git.invocation(&[
            "git for-each-ref --format='%(upstream:short)' \"$(git symbolic-ref -q HEAD)\"",
        ]);
        assert_eq!(
            invocation.program,
            Program::Shell(
                "hub for-each-ref --format='%(upstream:short)' \"$(hub symbolic-ref -q HEAD)\""
                    .to_string()
            )
        );

        let invocation = git.invocation(&["echo --git-dir digit"]);
        assert_eq!(
            invocation.program,
            Program::Shell("echo --git-dir digit".to_string())
        );
    }

    #[test]
    fn query_accepts_declared_exit_codes() {
        let runner = ScriptedRunner::new().on("git diff --quiet", 1, "", "");
        let git = Git::new("/repo", None, &runner);
        let result = git.query(&["diff", "--quiet"], Some(&[0, 1])).expect("query");
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn query_rejects_undeclared_exit_codes() {
        let runner =
            ScriptedRunner::new().on("git diff --quiet", 128, "", "fatal: not a git repository\n");
        let git = Git::new("/repo", None, &runner);
        let err = git
            .query(&["diff", "--quiet"], Some(&[0, 1]))
            .expect_err("should fail");
        match err {
            Failure::Tool {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, 128);
                assert_eq!(stderr, "fatal: not a git repository");
            }
            other => panic!("unexpected failure {other:?}"),
        }
    }

    #[test]
    fn query_without_expectation_returns_any_exit_code() {
        let runner = ScriptedRunner::new().on("git rev-parse --verify nope", 128, "", "");
        let git = Git::new("/repo", None, &runner);
        let result = git.query(&["rev-parse", "--verify", "nope"], None).expect("query");
        assert_eq!(result.exit_code, 128);
    }

    #[test]
    fn change_fails_on_non_zero_and_records_transcript() {
        let runner = ScriptedRunner::new()
            .on("git checkout main", 0, "", "Switched to branch 'main'\n")
            .on("git push origin main", 1, "", "rejected\n");
        let git = Git::new("/repo", None, &runner);
        git.change(&["checkout", "main"]).expect("checkout");
        let err = git.change(&["push", "origin", "main"]).expect_err("push");
        assert_eq!(err.kind(), "tool");

        let commands: Vec<String> = git.transcript().into_iter().map(|r| r.command).collect();
        assert_eq!(commands, vec!["git checkout main", "git push origin main"]);
    }
}

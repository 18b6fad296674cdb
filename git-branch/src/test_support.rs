//! Test-only helpers: a scripted command runner and throwaway git repositories.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::spec::{Declared, Kind};
use crate::core::types::{CommandResult, Mode};
use crate::io::process::{CommandRunner, Invocation};

/// Runner that answers from a script keyed by command line and records calls.
///
/// Several answers for one command are replayed in order; the last one repeats.
/// Unscripted commands fail like a spawn error.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: RefCell<HashMap<String, VecDeque<CommandResult>>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        self,
        command: &str,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        self.responses
            .borrow_mut()
            .entry(command.to_string())
            .or_default()
            .push_back(CommandResult::new(exit_code, stdout, stderr));
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandResult> {
        let command = invocation.to_string();
        self.calls.borrow_mut().push(command.clone());
        let mut responses = self.responses.borrow_mut();
        let queue = responses
            .get_mut(&command)
            .ok_or_else(|| anyhow!("unscripted command: {command}"))?;
        let result = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        result.ok_or_else(|| anyhow!("no scripted result left for: {command}"))
    }
}

/// Declaration rooted at `/repo` with no git override.
pub fn declared(mode: Mode, branch: Option<&str>, kind: Kind) -> Declared {
    Declared {
        mode,
        repository: PathBuf::from("/repo"),
        branch: branch.map(str::to_string),
        git_command: None,
        kind,
    }
}

/// A working copy on `main` that tracks `origin/main` in a bare sibling repository.
pub struct TestRepo {
    temp: TempDir,
    work: PathBuf,
    remote: PathBuf,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let remote = temp.path().join("remote.git");
        let work = temp.path().join("work");

        git_in(temp.path(), &["init", "--bare", "remote.git"])?;
        git_in(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"])?;

        git_in(temp.path(), &["init", "work"])?;
        git_in(&work, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        configure_identity(&work)?;

        let repo = Self { temp, work, remote };
        repo.commit_file("README.md", "hello\n", "initial commit")?;
        let remote_url = repo.remote.display().to_string();
        repo.git(&["remote", "add", "origin", &remote_url])?;
        repo.git(&["push", "-u", "origin", "main"])?;
        Ok(repo)
    }

    /// Path of the working copy.
    pub fn path(&self) -> &Path {
        &self.work
    }

    pub fn remote_path(&self) -> &Path {
        &self.remote
    }

    /// Run git in the working copy; non-zero exits are errors. Returns stdout.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        git_in(&self.work, args)
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.work.join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn commit_file(&self, name: &str, contents: &str, message: &str) -> Result<()> {
        self.write_file(name, contents)?;
        self.git(&["add", name])?;
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    /// Second clone of the remote, for changes made "elsewhere".
    pub fn clone_peer(&self, name: &str) -> Result<PathBuf> {
        let remote_url = self.remote.display().to_string();
        git_in(self.temp.path(), &["clone", &remote_url, name])?;
        let peer = self.temp.path().join(name);
        configure_identity(&peer)?;
        Ok(peer)
    }

    pub fn head(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_string())
    }
}

/// Run git in `dir`; non-zero exits are errors. Returns stdout.
pub fn git_in(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn configure_identity(dir: &Path) -> Result<()> {
    git_in(dir, &["config", "user.email", "tests@example.com"])?;
    git_in(dir, &["config", "user.name", "Tests"])?;
    git_in(dir, &["config", "commit.gpgsign", "false"])?;
    git_in(dir, &["config", "pull.rebase", "false"])?;
    Ok(())
}

//! Process-execution collaborator: runs an invocation and captures its output.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::types::CommandResult;

/// Exit code reported for processes killed by a signal or by the timeout.
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// What to run: an argv list, or a command line interpreted by `sh -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    Argv(Vec<String>),
    Shell(String),
}

/// A single command invocation, always run inside `workdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub workdir: PathBuf,
    pub program: Program,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.program {
            Program::Argv(argv) => f.write_str(&argv.join(" ")),
            Program::Shell(line) => f.write_str(line),
        }
    }
}

/// Runs invocations. Tests substitute a scripted implementation.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandResult>;
}

/// Runner that spawns real processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Kill the process after this long; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Bytes kept per stream; the rest is drained and discarded.
    pub output_limit_bytes: usize,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            timeout: None,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(workdir = %invocation.workdir.display()))]
    fn run(&self, invocation: &Invocation) -> Result<CommandResult> {
        let mut cmd = match &invocation.program {
            Program::Argv(argv) => {
                let (program, args) = argv
                    .split_first()
                    .ok_or_else(|| anyhow!("empty argv invocation"))?;
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            Program::Shell(line) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                cmd
            }
        };
        cmd.current_dir(&invocation.workdir);

        let output = run_command(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run `{invocation}`"))?;

        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.timed_out {
            stderr.push_str("\n[command timed out]");
        }
        Ok(CommandResult {
            exit_code: output.status.code().unwrap_or(SIGNALED_EXIT_CODE),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }
}

/// Captured child process output.
#[derive(Debug)]
struct CapturedOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    timed_out: bool,
}

/// Run a command and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
fn run_command(
    mut cmd: Command,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<CapturedOutput> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match timeout {
        None => child.wait().context("wait for command")?,
        Some(limit) => match child.wait_timeout(limit).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(timeout_secs = limit.as_secs(), "command timed out, killing");
                timed_out = true;
                child.kill().context("kill command")?;
                child.wait().context("wait command after kill")?
            }
        },
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CapturedOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(line: &str) -> Invocation {
        Invocation {
            workdir: std::env::temp_dir(),
            program: Program::Shell(line.to_string()),
        }
    }

    #[test]
    fn captures_exit_code_and_streams() {
        let result = SystemRunner::default()
            .run(&shell("echo out; echo err >&2; exit 3"))
            .expect("run");
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
    }

    #[test]
    fn runs_argv_in_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let invocation = Invocation {
            workdir: temp.path().to_path_buf(),
            program: Program::Argv(vec!["pwd".to_string()]),
        };
        let result = SystemRunner::default().run(&invocation).expect("run");
        assert!(result.success());
        let reported = std::fs::canonicalize(result.stdout.trim()).expect("canonicalize");
        let expected = std::fs::canonicalize(temp.path()).expect("canonicalize");
        assert_eq!(reported, expected);
    }

    #[test]
    fn truncates_output_beyond_limit() {
        let runner = SystemRunner {
            timeout: None,
            output_limit_bytes: 4,
        };
        let result = runner.run(&shell("printf abcdefgh")).expect("run");
        assert_eq!(result.stdout, "abcd");
    }

    #[test]
    fn timeout_kills_the_process() {
        let runner = SystemRunner {
            timeout: Some(Duration::from_millis(200)),
            output_limit_bytes: 1024,
        };
        let result = runner.run(&shell("exec sleep 5")).expect("run");
        assert_eq!(result.exit_code, SIGNALED_EXIT_CODE);
        assert!(result.stderr.contains("timed out"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let invocation = Invocation {
            workdir: std::env::temp_dir(),
            program: Program::Argv(vec!["definitely-not-a-real-binary-xyz".to_string()]),
        };
        let err = SystemRunner::default()
            .run(&invocation)
            .expect_err("spawn should fail");
        assert!(format!("{err:#}").contains("spawn command"));
    }
}

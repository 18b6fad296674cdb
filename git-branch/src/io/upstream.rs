//! Upstream resolution for push and pull postconditions.

use std::cell::OnceCell;

use tracing::debug;

use crate::core::failure::Failure;
use crate::core::types::Upstream;
use crate::io::git::Git;

/// Remote assumed when a tracking name does not start with a known remote.
pub const DEFAULT_REMOTE: &str = "origin";

const CURRENT_UPSTREAM: &str =
    "git for-each-ref --format='%(upstream:short)' \"$(git symbolic-ref -q HEAD)\"";

/// Resolves the upstream of one branch spec, memoized for the resolver's lifetime.
pub struct UpstreamResolver {
    branch: Option<String>,
    remotes: OnceCell<Vec<String>>,
    upstream: OnceCell<Option<Upstream>>,
}

impl UpstreamResolver {
    /// `branch = None` resolves whatever branch is checked out.
    pub fn new(branch: Option<String>) -> Self {
        Self {
            branch,
            remotes: OnceCell::new(),
            upstream: OnceCell::new(),
        }
    }

    /// Branch spec this resolver answers for.
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// The configured upstream, or `None` when nothing is tracked.
    pub fn resolve(&self, git: &Git<'_>) -> Result<Option<&Upstream>, Failure> {
        if let Some(cached) = self.upstream.get() {
            return Ok(cached.as_ref());
        }
        let resolved = self.lookup(git)?;
        Ok(self.upstream.get_or_init(|| resolved).as_ref())
    }

    /// Like [`resolve`](Self::resolve), but a missing upstream is fatal.
    pub fn require(&self, git: &Git<'_>) -> Result<&Upstream, Failure> {
        self.resolve(git)?.ok_or_else(|| Failure::NoUpstream {
            target: match &self.branch {
                Some(name) => format!("branch `{name}`"),
                None => "the current branch".to_string(),
            },
        })
    }

    fn lookup(&self, git: &Git<'_>) -> Result<Option<Upstream>, Failure> {
        let tracking = match &self.branch {
            Some(name) => {
                let refname = format!("refs/heads/{name}");
                git.query(
                    &["for-each-ref", "--format=%(upstream:short)", &refname],
                    Some(&[0]),
                )?
            }
            None => git.query(&[CURRENT_UPSTREAM], Some(&[0]))?,
        };
        let tracking = tracking.stdout.trim();
        if tracking.is_empty() {
            debug!(branch = ?self.branch, "no upstream configured");
            return Ok(None);
        }
        let upstream = split_tracking(tracking, self.remotes(git)?);
        debug!(remote = %upstream.remote, branch = %upstream.branch, "resolved upstream");
        Ok(Some(upstream))
    }

    fn remotes(&self, git: &Git<'_>) -> Result<&[String], Failure> {
        if let Some(cached) = self.remotes.get() {
            return Ok(cached);
        }
        let out = git.query(&["remote"], Some(&[0]))?;
        let names = out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(self.remotes.get_or_init(|| names))
    }
}

/// Split a short tracking name into remote and branch.
///
/// The part before the first `/` is the remote only when it names a known
/// remote; otherwise the whole name is a branch on [`DEFAULT_REMOTE`].
pub fn split_tracking(tracking: &str, remotes: &[String]) -> Upstream {
    if let Some((head, rest)) = tracking.split_once('/')
        && remotes.iter().any(|remote| remote == head)
    {
        return Upstream::new(head, rest);
    }
    Upstream::new(DEFAULT_REMOTE, tracking)
}

use tracing::debug;

use crate::core::failure::Failure;
use crate::core::postcondition::Postcondition;
use crate::core::spec::PullOptions;
use crate::core::types::{CommandRecord, Mode, Upstream};
use crate::io::upstream::UpstreamResolver;
use crate::postconditions::Common;

/// The upstream's tip is fetched and contained in HEAD.
pub struct Pulled<'a> {
    common: Common<'a>,
    options: PullOptions,
    upstream: UpstreamResolver,
}

impl<'a> Pulled<'a> {
    pub fn new(common: Common<'a>, options: PullOptions) -> Self {
        let source = options.from.clone().or_else(|| common.branch.clone());
        Self {
            common,
            options,
            upstream: UpstreamResolver::new(source),
        }
    }

    /// Tip of the branch on the remote; `None` when the remote lacks it.
    fn remote_tip(&self, upstream: &Upstream) -> Result<Option<String>, Failure> {
        let refname = format!("refs/heads/{}", upstream.branch);
        let out = self.common.git.query(
            &["ls-remote", "--exit-code", &upstream.remote, &refname],
            Some(&[0, 2]),
        )?;
        if out.exit_code == 2 {
            return Ok(None);
        }
        Ok(out.stdout.lines().find_map(|line| {
            let (sha, name) = line.split_once('\t')?;
            (name.trim() == refname).then(|| sha.trim().to_string())
        }))
    }

    /// Tip of the local remote-tracking ref; `None` before the first fetch.
    fn tracking_tip(&self, upstream: &Upstream) -> Result<Option<String>, Failure> {
        let out = self.common.git.query(
            &["rev-parse", "--verify", "--quiet", &upstream.tracking_ref()],
            Some(&[0, 1]),
        )?;
        Ok((out.exit_code == 0).then(|| out.stdout.trim().to_string()))
    }

    /// Whether the fetched tip is already an ancestor of HEAD.
    fn merged(&self, upstream: &Upstream) -> Result<bool, Failure> {
        let out = self.common.git.query(
            &[
                "merge-base",
                "--is-ancestor",
                &upstream.tracking_ref(),
                "HEAD",
            ],
            Some(&[0, 1]),
        )?;
        Ok(out.exit_code == 0)
    }
}

impl Postcondition for Pulled<'_> {
    fn explainer(&self) -> String {
        self.common.explainer.clone()
    }

    fn mode(&self) -> Mode {
        self.common.mode
    }

    fn dry_run(&self) -> bool {
        self.common.dry_run
    }

    fn holds(&self) -> Result<bool, Failure> {
        let upstream = self.upstream.require(&self.common.git)?;
        let remote = self.remote_tip(upstream)?;
        let tracking = self.tracking_tip(upstream)?;
        if remote.is_some() && remote != tracking {
            debug!(?remote, ?tracking, "fetch would move the remote-tracking ref");
            return Ok(false);
        }
        if tracking.is_none() {
            return Ok(true);
        }
        self.merged(upstream)
    }

    fn enforce(&self) -> Result<(), Failure> {
        let upstream = self.upstream.require(&self.common.git)?;
        let mut args: Vec<&str> = vec!["pull"];
        if self.options.rebase {
            args.push("--rebase");
        }
        if self.options.autostash {
            args.push("--autostash");
        }
        args.push(upstream.remote.as_str());
        args.push(upstream.branch.as_str());
        self.common.git.change(&args)?;
        Ok(())
    }

    fn transcript(&self) -> Vec<CommandRecord> {
        self.common.git.transcript()
    }
}

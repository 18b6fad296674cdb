use crate::core::failure::Failure;
use crate::core::postcondition::Postcondition;
use crate::core::spec::PushOptions;
use crate::core::types::{CommandRecord, Mode, Upstream};
use crate::io::upstream::UpstreamResolver;
use crate::postconditions::Common;

/// The upstream already has everything a push would send.
pub struct Pushed<'a> {
    common: Common<'a>,
    options: PushOptions,
    upstream: UpstreamResolver,
}

impl<'a> Pushed<'a> {
    pub fn new(common: Common<'a>, options: PushOptions) -> Self {
        let target = options.to.clone().or_else(|| common.branch.clone());
        Self {
            common,
            options,
            upstream: UpstreamResolver::new(target),
        }
    }

    /// `--force` wins over `--force-with-lease`; at most one is passed.
    fn force_flag(&self) -> Option<&'static str> {
        if self.options.force {
            Some("--force")
        } else if self.options.force_with_lease {
            Some("--force-with-lease")
        } else {
            None
        }
    }

    fn refspec(&self, upstream: &Upstream) -> String {
        let source = self.upstream.branch().unwrap_or("HEAD");
        format!("{source}:refs/heads/{}", upstream.branch)
    }
}

impl Postcondition for Pushed<'_> {
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
        let refspec = self.refspec(upstream);
        let mut args: Vec<&str> = vec!["push", "--dry-run", "--porcelain"];
        args.extend(self.force_flag());
        args.push(upstream.remote.as_str());
        args.push(refspec.as_str());

        // Exit code 1 covers rejected refs, which still print a porcelain line.
        let out = self.common.git.query(&args, Some(&[0, 1]))?;
        let flags = porcelain_flags(&out.stdout);
        if out.exit_code != 0 && flags.is_empty() {
            return Err(self.common.git.failure(&args, &out));
        }
        Ok(flags.iter().all(|flag| *flag == '='))
    }

    fn enforce(&self) -> Result<(), Failure> {
        let upstream = self.upstream.require(&self.common.git)?;
        let refspec = self.refspec(upstream);
        let mut args: Vec<&str> = vec!["push"];
        args.extend(self.force_flag());
        args.push(upstream.remote.as_str());
        args.push(refspec.as_str());
        self.common.git.change(&args)?;
        Ok(())
    }

    fn transcript(&self) -> Vec<CommandRecord> {
        self.common.git.transcript()
    }
}

/// Per-ref flags from `git push --porcelain` output.
///
/// Ref lines look like `<flag>\t<from>:<to>\t<summary>`; `=` means up to date.
fn porcelain_flags(stdout: &str) -> Vec<char> {
    stdout
        .lines()
        .filter_map(|line| {
            let (flag, rest) = line.split_once('\t')?;
            let mut chars = flag.chars();
            let c = chars.next()?;
            (chars.next().is_none() && rest.contains(':')).then_some(c)
        })
        .collect()
}

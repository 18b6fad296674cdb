//! Git branch postconditions built on the command adapter.

mod checked_out;
mod committed;
mod pulled;
mod pushed;

pub use checked_out::CheckedOut;
pub use committed::Committed;
pub use pulled::Pulled;
pub use pushed::Pushed;

use crate::core::postcondition::Postcondition;
use crate::core::spec::{Declared, Kind};
use crate::core::types::Mode;
use crate::io::git::Git;
use crate::io::process::CommandRunner;

/// State shared by every variant: the declared settings and a private adapter.
pub struct Common<'a> {
    pub mode: Mode,
    pub dry_run: bool,
    pub branch: Option<String>,
    pub explainer: String,
    pub git: Git<'a>,
}

impl<'a> Common<'a> {
    /// `default_git` applies when the declaration carries no override.
    pub fn new(
        declared: &Declared,
        dry_run: bool,
        default_git: Option<&str>,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        let command = declared.git_command.as_deref().or(default_git);
        Self {
            mode: declared.mode,
            dry_run,
            branch: declared.branch.clone(),
            explainer: declared.explainer(),
            git: Git::new(&declared.repository, command, runner),
        }
    }
}

/// Build the postcondition for one declaration.
pub fn build<'a>(
    declared: Declared,
    dry_run: bool,
    default_git: Option<&str>,
    runner: &'a dyn CommandRunner,
) -> Box<dyn Postcondition + 'a> {
    let common = Common::new(&declared, dry_run, default_git, runner);
    match declared.kind {
        Kind::CheckedOut => Box::new(CheckedOut::new(common)),
        Kind::Committed { message } => Box::new(Committed::new(common, message)),
        Kind::Pulled(options) => Box::new(Pulled::new(common, options)),
        Kind::Pushed(options) => Box::new(Pushed::new(common, options)),
    }
}

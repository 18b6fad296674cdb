use crate::core::failure::Failure;
use crate::core::postcondition::Postcondition;
use crate::core::types::{CommandRecord, Mode};
use crate::postconditions::Common;

/// The declared branch is checked out; without one, HEAD is not detached.
pub struct CheckedOut<'a> {
    common: Common<'a>,
}

impl<'a> CheckedOut<'a> {
    pub fn new(common: Common<'a>) -> Self {
        Self { common }
    }
}

impl Postcondition for CheckedOut<'_> {
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
        let out = self
            .common
            .git
            .query(&["branch", "--show-current"], Some(&[0]))?;
        let current = out.stdout.trim();
        Ok(match &self.common.branch {
            Some(branch) => current == branch,
            None => !current.is_empty(),
        })
    }

    fn enforce(&self) -> Result<(), Failure> {
        let branch = self
            .common
            .branch
            .as_deref()
            .ok_or_else(|| Failure::Declined {
                explainer: self.explainer(),
                reason: "no branch name given, nothing to check out".to_string(),
            })?;
        self.common.git.change(&["checkout", branch])?;
        Ok(())
    }

    fn transcript(&self) -> Vec<CommandRecord> {
        self.common.git.transcript()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::Kind;
    use crate::test_support::{ScriptedRunner, declared};

    fn checked_out<'a>(runner: &'a ScriptedRunner, branch: Option<&str>) -> CheckedOut<'a> {
        let decl = declared(Mode::Ensure, branch, Kind::CheckedOut);
        CheckedOut::new(Common::new(&decl, false, None, runner))
    }

    #[test]
    fn holds_when_named_branch_is_current() {
        let runner = ScriptedRunner::new().on("git branch --show-current", 0, "release\n", "");
        assert!(checked_out(&runner, Some("release")).holds().expect("holds"));
        assert!(!checked_out(&runner, Some("main")).holds().expect("holds"));
    }

    #[test]
    fn any_branch_holds_unless_detached() {
        let attached = ScriptedRunner::new().on("git branch --show-current", 0, "main\n", "");
        assert!(checked_out(&attached, None).holds().expect("holds"));

        let detached = ScriptedRunner::new().on("git branch --show-current", 0, "\n", "");
        assert!(!checked_out(&detached, None).holds().expect("holds"));
    }

    #[test]
    fn enforce_checks_out_the_branch() {
        let runner = ScriptedRunner::new().on("git checkout release", 0, "", "");
        let postcondition = checked_out(&runner, Some("release"));
        postcondition.enforce().expect("enforce");
        assert_eq!(runner.calls(), vec!["git checkout release"]);
    }

    #[test]
    fn enforce_without_branch_is_declined() {
        let runner = ScriptedRunner::new();
        let err = checked_out(&runner, None)
            .enforce()
            .expect_err("nothing to check out");
        assert_eq!(err.kind(), "declined");
        assert!(runner.calls().is_empty());
    }
}

use crate::core::failure::Failure;
use crate::core::postcondition::Postcondition;
use crate::core::types::{CommandRecord, Mode};
use crate::postconditions::Common;

/// `git diff --quiet` exits 1 when differences exist; anything else is an error.
const DIFF_EXIT_CODES: &[i32] = &[0, 1];

/// No staged or unstaged changes to tracked files.
pub struct Committed<'a> {
    common: Common<'a>,
    message: Option<String>,
}

impl<'a> Committed<'a> {
    pub fn new(common: Common<'a>, message: Option<String>) -> Self {
        Self { common, message }
    }
}

impl Postcondition for Committed<'_> {
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
        let git = &self.common.git;
        let unstaged = git.query(&["diff", "--quiet"], Some(DIFF_EXIT_CODES))?;
        if unstaged.exit_code != 0 {
            return Ok(false);
        }
        let staged = git.query(&["diff", "--cached", "--quiet"], Some(DIFF_EXIT_CODES))?;
        Ok(staged.exit_code == 0)
    }

    fn passive(&self) -> Result<Option<String>, Failure> {
        Ok(self
            .message
            .is_none()
            .then(|| "no commit message supplied".to_string()))
    }

    fn enforce(&self) -> Result<(), Failure> {
        let message = self.message.as_deref().ok_or_else(|| Failure::Declined {
            explainer: self.explainer(),
            reason: "no commit message supplied".to_string(),
        })?;
        self.common.git.change(&["commit", "-a", "-m", message])?;
        Ok(())
    }

    fn transcript(&self) -> Vec<CommandRecord> {
        self.common.git.transcript()
    }
}

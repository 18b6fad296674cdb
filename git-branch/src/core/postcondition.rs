//! The postcondition protocol and the loop that drives a sequence of them.
//!
//! Postconditions are gates evaluated in declaration order: the first one
//! that cannot be satisfied stops the sequence, and nothing already enforced
//! is rolled back.

use tracing::{debug, info, instrument, warn};

use crate::core::failure::Failure;
use crate::core::types::{CommandRecord, Mode, Outcome, OutcomeStatus, Report};

/// A declarative goal about repository state.
pub trait Postcondition {
    /// Human description used in reports and errors.
    fn explainer(&self) -> String;

    fn mode(&self) -> Mode;

    /// True when mutating commands are forbidden.
    fn dry_run(&self) -> bool;

    /// Whether the goal is already met. Issues no mutating command.
    fn holds(&self) -> Result<bool, Failure>;

    /// Called when `holds()` is false. `Some(reason)` vetoes enforcement.
    fn passive(&self) -> Result<Option<String>, Failure> {
        Ok(None)
    }

    /// Run the minimal mutating commands that make `holds()` true.
    fn enforce(&self) -> Result<(), Failure>;

    /// Commands issued so far on behalf of this postcondition.
    fn transcript(&self) -> Vec<CommandRecord>;
}

/// Evaluate postconditions in order and aggregate their outcomes.
///
/// Fails fast: the first failure is recorded on the report and the
/// remaining postconditions are dropped unevaluated.
#[instrument(skip_all, fields(count = postconditions.len()))]
pub fn evaluate<'a>(postconditions: Vec<Box<dyn Postcondition + 'a>>) -> Report {
    let mut report = Report::default();
    for postcondition in postconditions {
        let explainer = postcondition.explainer();
        let result = evaluate_one(postcondition.as_ref());
        let commands = postcondition.transcript();
        match result {
            Ok(status) => {
                debug!(%explainer, ?status, "postcondition evaluated");
                report.record(Outcome {
                    explainer,
                    status,
                    commands,
                });
            }
            Err(failure) => {
                warn!(%explainer, kind = failure.kind(), "postcondition failed");
                report.record(Outcome {
                    explainer,
                    status: OutcomeStatus::Failed,
                    commands,
                });
                report.fail(failure.kind(), failure.to_string());
                return report;
            }
        }
    }
    report
}

fn evaluate_one(postcondition: &dyn Postcondition) -> Result<OutcomeStatus, Failure> {
    if postcondition.holds()? {
        return Ok(OutcomeStatus::Satisfied);
    }

    if let Some(reason) = postcondition.passive()? {
        return Err(Failure::Declined {
            explainer: postcondition.explainer(),
            reason,
        });
    }

    match postcondition.mode() {
        Mode::Verify => Err(Failure::Unverified {
            explainer: postcondition.explainer(),
        }),
        Mode::Ensure if postcondition.dry_run() => Ok(OutcomeStatus::WouldEnforce),
        Mode::Ensure => {
            info!(explainer = %postcondition.explainer(), "enforcing");
            postcondition.enforce()?;
            Ok(OutcomeStatus::Enforced)
        }
    }
}

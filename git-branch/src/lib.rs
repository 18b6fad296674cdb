//! Reconcile a git working copy against declared branch postconditions.
//!
//! A postcondition ("branch X is checked out", "the tree is committed",
//! "the branch is pulled/pushed") is checked with `holds`, may veto automatic
//! fixing with `passive`, and is fixed with `enforce`. The crate keeps a
//! strict separation:
//!
//! - **[`core`]**: the protocol, the driving loop, the decoder and shared types.
//!   No process spawning.
//! - **[`io`]**: process execution, the git command adapter, upstream
//!   resolution and configuration loading.
//! - **[`postconditions`]**: the four git postconditions.
//!
//! [`apply::apply`] ties them together.

pub mod apply;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod postconditions;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

//! Stable exit codes for git-branch CLI commands.

/// Every postcondition holds (or was enforced).
pub const OK: i32 = 0;
/// A postcondition failed: declined, unverified, no upstream, or a git error.
pub const FAILED: i32 = 1;
/// The specification or tool configuration is invalid; nothing ran.
pub const INVALID: i32 = 2;

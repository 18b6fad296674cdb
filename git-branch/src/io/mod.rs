//! Side-effecting helpers: process execution, the git adapter, configuration.

pub mod config;
pub mod git;
pub mod process;
pub mod upstream;

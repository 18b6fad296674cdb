//! Deterministic logic for the postcondition engine.
//!
//! Core modules are free of process spawning. They operate on in-memory data
//! and reach the repository only through the `Postcondition` trait.

pub mod failure;
pub mod postcondition;
pub mod spec;
pub mod types;

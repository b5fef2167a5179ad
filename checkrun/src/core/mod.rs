//! Deterministic, pure logic for the test engine.
//!
//! Core modules must be free of I/O side effects. They operate on strings and
//! in-memory values so directive parsing, placeholder substitution, pipeline
//! splitting and check verification can be tested without spawning anything.

pub mod directive;
pub mod pipeline;
pub mod placeholder;
pub mod types;
pub mod verify;

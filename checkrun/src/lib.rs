//! Directive-driven test runner for compiler and optimizer tools.
//!
//! A test is a source file whose comments carry a `RUN:` pipeline and `CHECK:`
//! lines. The pipeline runs with the file itself on stdin, and the CHECK
//! strings must appear in its output in order. The crate is split like this:
//!
//! - **[`core`]**: Pure logic (directive recognition, placeholder
//!   substitution, pipeline splitting, check verification). No I/O.
//! - **[`io`]**: Config, tool lookup, discovery, scratch directories and the
//!   process pipeline executor.
//!
//! [`run`] ties the two together for one test and [`suite`] aggregates many.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
pub mod suite;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

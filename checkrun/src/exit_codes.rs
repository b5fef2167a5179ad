//! Stable exit codes for the `checkrun` CLI.

/// Every test passed or was skipped.
pub const OK: i32 = 0;
/// At least one test failed.
pub const FAILED: i32 = 1;
/// Bad usage, invalid configuration, or a tool that could not be resolved.
pub const INVALID: i32 = 2;

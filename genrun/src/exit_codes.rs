//! Stable exit codes for the `genrun` CLI.

/// Command ran and the child exited with status 0.
pub const OK: i32 = 0;
/// Invalid arguments/config, spawn failure or another runner error.
pub const INVALID: i32 = 1;
/// The child was killed after the timeout elapsed.
pub const TIMED_OUT: i32 = 2;
/// The child exited with a non-zero status.
pub const CHILD_FAILED: i32 = 3;

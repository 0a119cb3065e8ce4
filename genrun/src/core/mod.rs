//! Pure logic shared by the generator runner.
//!
//! Core modules are free of I/O side effects: they build values that the
//! [`crate::io`] layer executes.

pub mod command;
pub mod types;

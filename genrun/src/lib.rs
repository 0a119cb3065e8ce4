//! Supervised runner for generator and package-manager CLIs.
//!
//! A generation job runs a handful of external commands in its working
//! directory. Each command is started once, bounded by a hard timeout and its
//! stdout is forwarded line by line to a per-job [`io::log_sink::LogSink`]
//! while it runs.
//!
//! - **[`core`]**: Pure command-line construction and shared types.
//! - **[`io`]**: Configuration, log sinks, the process supervisor and the
//!   [`io::generator::GeneratorService`] facade.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::types::{CiCdTool, CommandSpec, GenerationJobId};
pub use crate::error::{GeneratorError, Result};
pub use crate::io::generator::GeneratorService;
pub use crate::io::log_sink::{FileLogSink, LogSink, MemoryLogSink};
pub use crate::io::process::{InvocationOutcome, ShutdownSignal};

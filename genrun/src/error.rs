//! Failures surfaced by generator operations.

use std::io;

use thiserror::Error;

use crate::core::types::GenerationJobId;

#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Rejected before any process was started.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The child process could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading the child's output failed after it started.
    #[error("failed to read process output: {0}")]
    Io(#[from] io::Error),

    /// The timeout wait was cut short by a shutdown request.
    #[error("watchdog for job {job} was interrupted")]
    WatchdogInterrupted { job: GenerationJobId },

    #[error("watchdog thread panicked")]
    WatchdogPanicked,
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

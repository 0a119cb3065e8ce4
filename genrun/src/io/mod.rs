//! Side-effecting parts of the runner: config files, log sinks and child processes.

pub mod config;
pub mod generator;
pub mod log_sink;
pub mod process;

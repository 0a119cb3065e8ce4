//! Test-only helpers for stub commands and process checks.

use std::process::{Command, Stdio};

use crate::core::types::CommandSpec;

/// Argument prefix that runs `script` with `sh -c`.
///
/// Arguments appended after the prefix are visible to the script as `"$@"`.
pub fn sh_prefix(script: &str) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        script.to_string(),
        "genrun-stub".to_string(),
    ]
}

/// Command that runs `script` with `sh -c`.
pub fn sh(script: &str) -> CommandSpec {
    let mut argv = sh_prefix(script).into_iter();
    let program = argv.next().unwrap_or_default();
    CommandSpec::new(program, argv)
}

/// Whether a process with `pid` is still present (`kill -0`).
pub fn process_exists(pid: u32) -> bool {
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

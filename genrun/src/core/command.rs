//! Argument vectors for each generator operation and the platform wrapper.

use crate::core::types::{CiCdTool, CommandSpec};

const FORCE_INSIGHT: &str = "--force-insight";
const SKIP_CHECKS: &str = "--skip-checks";
const SKIP_INSTALL: &str = "--skip-install";
const FORCE: &str = "--force";

/// Extension appended to the domain-model base name for `import-jdl`.
pub const JDL_EXTENSION: &str = ".jh";

/// `<package-manager> install --ignore-scripts --package-lock-only`
pub fn install_dependencies(package_manager: &CommandSpec) -> CommandSpec {
    package_manager.with_args(["install", "--ignore-scripts", "--package-lock-only"])
}

/// Run the generator against the project in the working directory.
pub fn generate_application(generator: &CommandSpec) -> CommandSpec {
    generator.with_args([
        FORCE_INSIGHT,
        SKIP_CHECKS,
        SKIP_INSTALL,
        "--skip-cache",
        "--skip-git",
        FORCE,
    ])
}

/// Import `<base_name>.jh`.
///
/// The base name is passed through verbatim: dots and path separators are
/// kept and the extension is always appended once.
pub fn import_jdl(generator: &CommandSpec, base_name: &str) -> CommandSpec {
    let file_name = format!("{base_name}{JDL_EXTENSION}");
    generator.with_args([
        "import-jdl",
        file_name.as_str(),
        FORCE_INSIGHT,
        SKIP_CHECKS,
        SKIP_INSTALL,
        FORCE,
    ])
}

pub fn configure_ci_cd(generator: &CommandSpec, tool: CiCdTool) -> CommandSpec {
    let autoconfigure = format!("--autoconfigure-{}", tool.command());
    generator.with_args([
        "ci-cd",
        autoconfigure.as_str(),
        FORCE_INSIGHT,
        SKIP_CHECKS,
        SKIP_INSTALL,
        FORCE,
    ])
}

/// How a command line is handed to the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Executed as-is.
    Direct,
    /// Routed through `cmd /c` so `.cmd` shims on the path resolve.
    CommandInterpreter,
}

impl Platform {
    /// Platform of the running host.
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(os_name: &str) -> Self {
        if os_name.to_ascii_lowercase().starts_with("win") {
            Platform::CommandInterpreter
        } else {
            Platform::Direct
        }
    }

    /// Final command line to spawn for `spec` on this platform.
    pub fn invocation(self, spec: &CommandSpec) -> CommandSpec {
        match self {
            Platform::Direct => spec.clone(),
            Platform::CommandInterpreter => CommandSpec::new("cmd", ["/c"]).with_args(spec.argv()),
        }
    }
}

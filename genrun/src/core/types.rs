//! Shared value types for generator invocations.
//!
//! These types carry no I/O. They are the stable contract between the command
//! builder, the process supervisor and the operation facade.

use std::fmt;

/// Identifier of one generation job, supplied by the caller.
///
/// Only used as a key to route log lines; never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationJobId(String);

impl GenerationJobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GenerationJobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for GenerationJobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Continuous-integration targets the generator can autoconfigure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CiCdTool {
    Jenkins,
    Gitlab,
    Travis,
    Github,
    Azure,
    CircleCi,
}

impl CiCdTool {
    pub const ALL: [CiCdTool; 6] = [
        CiCdTool::Jenkins,
        CiCdTool::Gitlab,
        CiCdTool::Travis,
        CiCdTool::Github,
        CiCdTool::Azure,
        CiCdTool::CircleCi,
    ];

    /// Token appended to `--autoconfigure-` on the generator command line.
    pub fn command(self) -> &'static str {
        match self {
            CiCdTool::Jenkins => "jenkins",
            CiCdTool::Gitlab => "gitlab",
            CiCdTool::Travis => "travis",
            CiCdTool::Github => "github",
            CiCdTool::Azure => "azure",
            CiCdTool::CircleCi => "circle",
        }
    }

    fn name(self) -> &'static str {
        match self {
            CiCdTool::CircleCi => "circleci",
            other => other.command(),
        }
    }

    /// Resolve a tool from its name or command token, ignoring case.
    ///
    /// Returns `None` for anything outside the supported set.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|tool| {
            tool.name().eq_ignore_ascii_case(name) || tool.command().eq_ignore_ascii_case(name)
        })
    }
}

impl fmt::Display for CiCdTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully resolved command line: program followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
}

impl CommandSpec {
    /// Build a spec from a program and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![program.into()];
        argv.extend(args.into_iter().map(Into::into));
        Self { argv }
    }

    /// Build a spec from an argument vector, `None` when it has no program.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        match argv.first() {
            Some(program) if !program.trim().is_empty() => Some(Self { argv }),
            _ => None,
        }
    }

    /// Copy of this spec with `args` appended.
    pub fn with_args<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = self.argv.clone();
        argv.extend(args.into_iter().map(Into::into));
        Self { argv }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

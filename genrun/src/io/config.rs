//! Generator configuration, typically stored as `genrun.toml`.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::CommandSpec;

/// Process-lifetime settings for the generator runner (TOML).
///
/// Resolved once at startup and passed explicitly to the components that
/// need it. Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Per-invocation wall-clock budget in seconds.
    pub timeout_secs: u64,

    pub generator: ToolConfig,

    pub package_manager: ToolConfig,
}

/// Command prefix used to launch an external tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Program followed by fixed leading arguments (e.g. `["npx","jhipster"]`).
    pub command: Vec<String>,
}

impl ToolConfig {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    fn validate(&self, name: &str) -> Result<CommandSpec> {
        CommandSpec::from_argv(self.command.clone())
            .ok_or_else(|| anyhow!("{name}.command must be a non-empty array"))
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            generator: ToolConfig::new(["jhipster"]),
            package_manager: ToolConfig::new(["npm"]),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        self.generator.validate("generator")?;
        self.package_manager.validate("package_manager")?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Generator command prefix.
    pub fn generator_command(&self) -> Result<CommandSpec> {
        self.generator.validate("generator")
    }

    /// Package-manager command prefix.
    pub fn package_manager_command(&self) -> Result<CommandSpec> {
        self.package_manager.validate("package_manager")
    }
}

/// Load config from a TOML file.
///
/// A missing file yields `GeneratorConfig::default()`; any other read failure
/// is an error.
pub fn load_config(path: &Path) -> Result<GeneratorConfig> {
    let cfg = match fs::read_to_string(path) {
        Ok(contents) => {
            toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => GeneratorConfig::default(),
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Write config to disk, replacing any existing file in one rename.
pub fn write_config(path: &Path, cfg: &GeneratorConfig) -> Result<()> {
    cfg.validate()?;
    let rendered = toml::to_string_pretty(cfg).context("serialize config toml")?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("toml.{}.tmp", std::process::id()));
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("create temp config {}", tmp_path.display()))?;
    file.write_all(rendered.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    drop(file);
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

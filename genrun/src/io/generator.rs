//! Named generator operations for a generation job.
//!
//! Every operation writes one descriptive line to the job log, builds its
//! command line and runs it once under the [`ProcessSupervisor`]. Nothing is
//! retried. Callers must not run two operations for the same job and working
//! directory at the same time.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::core::command::{self, Platform};
use crate::core::types::{CiCdTool, CommandSpec, GenerationJobId};
use crate::error::{GeneratorError, Result};
use crate::io::config::GeneratorConfig;
use crate::io::log_sink::LogSink;
use crate::io::process::{InvocationOutcome, InvocationRequest, ProcessSupervisor, ShutdownSignal};

pub const INSTALL_MESSAGE: &str = "Installing the JHipster version used by the project";
pub const GENERATE_MESSAGE: &str = "Running JHipster";
pub const IMPORT_JDL_MESSAGE: &str = "Running `jhipster import-jdl`";
pub const CI_CD_MESSAGE: &str = "Running `jhipster ci-cd`";
pub const CI_CD_UNSUPPORTED_MESSAGE: &str =
    "Continuous Integration system not supported, aborting";

/// Facade over the generator and package-manager CLIs.
pub struct GeneratorService {
    generator: CommandSpec,
    package_manager: CommandSpec,
    timeout: Duration,
    supervisor: ProcessSupervisor,
    sink: Arc<dyn LogSink>,
}

impl GeneratorService {
    pub fn new(
        config: &GeneratorConfig,
        sink: Arc<dyn LogSink>,
        shutdown: ShutdownSignal,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let generator = config.generator_command()?;
        info!("generator service will be using \"{generator}\" to run the generator");
        Ok(Self {
            generator,
            package_manager: config.package_manager_command()?,
            timeout: config.timeout(),
            supervisor: ProcessSupervisor::new(Platform::detect(), shutdown),
            sink,
        })
    }

    /// Install the project's pinned dependencies without running their scripts.
    #[instrument(skip_all, fields(job = %job))]
    pub fn install_dependencies(
        &self,
        job: &GenerationJobId,
        workdir: &Path,
    ) -> Result<InvocationOutcome> {
        self.sink.add_log(job, INSTALL_MESSAGE);
        let spec = command::install_dependencies(&self.package_manager);
        self.execute(job, workdir, &spec)
    }

    #[instrument(skip_all, fields(job = %job))]
    pub fn generate_application(
        &self,
        job: &GenerationJobId,
        workdir: &Path,
    ) -> Result<InvocationOutcome> {
        self.sink.add_log(job, GENERATE_MESSAGE);
        let spec = command::generate_application(&self.generator);
        self.execute(job, workdir, &spec)
    }

    /// Import `<base_name>.jh` from the working directory.
    ///
    /// `base_name` is not sanitized; callers accepting it from users must
    /// validate it first.
    #[instrument(skip_all, fields(job = %job, base_name = %base_name))]
    pub fn import_jdl(
        &self,
        job: &GenerationJobId,
        workdir: &Path,
        base_name: &str,
    ) -> Result<InvocationOutcome> {
        self.sink.add_log(job, IMPORT_JDL_MESSAGE);
        let spec = command::import_jdl(&self.generator, base_name);
        self.execute(job, workdir, &spec)
    }

    /// Configure continuous integration for `tool`.
    ///
    /// A missing tool is logged to the job and rejected before anything runs.
    #[instrument(skip_all, fields(job = %job, tool = ?tool))]
    pub fn configure_ci_cd(
        &self,
        job: &GenerationJobId,
        workdir: &Path,
        tool: Option<CiCdTool>,
    ) -> Result<InvocationOutcome> {
        let Some(tool) = tool else {
            self.sink.add_log(job, CI_CD_UNSUPPORTED_MESSAGE);
            warn!("unsupported continuous integration system");
            return Err(GeneratorError::InvalidArgument(
                "Invalid Continuous Integration system".to_string(),
            ));
        };
        self.sink.add_log(job, CI_CD_MESSAGE);
        let spec = command::configure_ci_cd(&self.generator, tool);
        self.execute(job, workdir, &spec)
    }

    /// Like [`Self::configure_ci_cd`], resolving the tool from its name.
    pub fn configure_ci_cd_by_name(
        &self,
        job: &GenerationJobId,
        workdir: &Path,
        tool: &str,
    ) -> Result<InvocationOutcome> {
        self.configure_ci_cd(job, workdir, CiCdTool::from_name(tool))
    }

    fn execute(
        &self,
        job: &GenerationJobId,
        workdir: &Path,
        spec: &CommandSpec,
    ) -> Result<InvocationOutcome> {
        let request = InvocationRequest {
            job,
            workdir,
            command: spec,
            timeout: self.timeout,
        };
        let outcome = self.supervisor.run(&request, &*self.sink)?;
        if outcome.timed_out {
            warn!(pid = outcome.pid, "generator command killed after timeout");
        } else {
            info!(exit_code = ?outcome.exit_code, lines = outcome.lines, "generator command ended");
        }
        Ok(outcome)
    }
}

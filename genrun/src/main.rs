//! Command-line driver for the generator runner.
//!
//! Runs a single generator operation for one job in a working directory and
//! prints the job log to stdout as it is produced.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genrun::io::config::{GeneratorConfig, load_config};
use genrun::{
    FileLogSink, GenerationJobId, GeneratorService, InvocationOutcome, LogSink, ShutdownSignal,
    exit_codes, logging,
};

#[derive(Parser)]
#[command(
    name = "genrun",
    version,
    about = "Run generator commands for a generation job under a hard timeout"
)]
struct Cli {
    /// TOML config file; defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "genrun.toml")]
    config: PathBuf,

    /// Generation job id used to key log lines (generated when omitted).
    #[arg(long, global = true)]
    job: Option<String>,

    /// Working directory of the project; must already exist.
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Also append job logs to `<LOG_DIR>/<job>.log`.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Install the project's dependencies with the package manager.
    Install,
    /// Generate the application.
    Generate,
    /// Import `<BASE_NAME>.jh` into the project.
    ImportJdl { base_name: String },
    /// Autoconfigure a continuous-integration system.
    CiCd { tool: String },
    /// Print the effective configuration.
    ShowConfig,
}

/// Prints each job line as `[job] line`.
struct StdoutLogSink;

impl LogSink for StdoutLogSink {
    fn add_log(&self, job: &GenerationJobId, line: &str) {
        println!("[{job}] {line}");
    }
}

/// Forwards every line to each inner sink in order.
struct TeeLogSink(Vec<Box<dyn LogSink>>);

impl LogSink for TeeLogSink {
    fn add_log(&self, job: &GenerationJobId, line: &str) {
        for sink in &self.0 {
            sink.add_log(job, line);
        }
    }

    fn close(&self, job: &GenerationJobId) {
        for sink in &self.0 {
            sink.close(job);
        }
    }
}

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("tracing disabled: {err}");
    }
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    let job = GenerationJobId::new(cli.job.clone().unwrap_or_else(default_job_id));
    let mut sinks: Vec<Box<dyn LogSink>> = vec![Box::new(StdoutLogSink)];
    if let Some(log_dir) = &cli.log_dir {
        sinks.push(Box::new(FileLogSink::new(log_dir)?));
    }
    let sink = Arc::new(TeeLogSink(sinks));
    let service = GeneratorService::new(&cfg, sink.clone(), ShutdownSignal::new())?;

    let outcome = match &cli.command {
        Command::Install => service.install_dependencies(&job, &cli.dir),
        Command::Generate => service.generate_application(&job, &cli.dir),
        Command::ImportJdl { base_name } => service.import_jdl(&job, &cli.dir, base_name),
        Command::CiCd { tool } => service.configure_ci_cd_by_name(&job, &cli.dir, tool),
        Command::ShowConfig => {
            print_config(&cfg)?;
            return Ok(exit_codes::OK);
        }
    };
    sink.close(&job);
    let outcome = outcome.with_context(|| format!("job {job}"))?;

    Ok(exit_code(&outcome))
}

fn exit_code(outcome: &InvocationOutcome) -> i32 {
    if outcome.timed_out {
        exit_codes::TIMED_OUT
    } else if outcome.success() {
        exit_codes::OK
    } else {
        exit_codes::CHILD_FAILED
    }
}

fn print_config(cfg: &GeneratorConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(cfg).context("serialize config toml")?;
    print!("{rendered}");
    Ok(())
}

fn default_job_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("job-{}-{secs}", std::process::id())
}

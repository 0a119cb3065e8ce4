//! Per-job log sinks that receive generator output.
//!
//! A [`LogSink`] is shared by every invocation in the process, so it must
//! accept concurrent appends for different jobs. Within one job the caller
//! never reorders its own calls; sinks only have to append.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::types::GenerationJobId;

/// Append-only, per-job ordered log collector.
pub trait LogSink: Send + Sync {
    fn add_log(&self, job: &GenerationJobId, line: &str);

    /// Release resources held for `job`. A later `add_log` starts over.
    fn close(&self, _job: &GenerationJobId) {}
}

/// Keeps every job's lines in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    logs: Mutex<HashMap<GenerationJobId, Vec<String>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines recorded for `job` so far.
    pub fn logs(&self, job: &GenerationJobId) -> Vec<String> {
        let logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        logs.get(job).cloned().unwrap_or_default()
    }

    /// Drop everything recorded for `job`.
    pub fn clear(&self, job: &GenerationJobId) {
        let mut logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        logs.remove(job);
    }
}

impl LogSink for MemoryLogSink {
    fn add_log(&self, job: &GenerationJobId, line: &str) {
        let mut logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        logs.entry(job.clone()).or_default().push(line.to_string());
    }
}

/// Appends each job's lines to a `<root>/<job>.log` file, flushing per line.
///
/// Job ids made only of ASCII letters, digits, `-`, `_` and non-leading `.`
/// are used as the file stem verbatim. Anything else is hex-encoded behind a
/// `hex-` prefix so that every id maps to its own file inside `root`.
#[derive(Debug)]
pub struct FileLogSink {
    root: PathBuf,
    writers: Mutex<HashMap<GenerationJobId, BufWriter<File>>>,
}

impl FileLogSink {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("create log dir {}", root.display()))?;
        Ok(Self {
            root,
            writers: Mutex::new(HashMap::new()),
        })
    }

    /// Log file for `job`.
    pub fn path_for(&self, job: &GenerationJobId) -> PathBuf {
        self.root.join(format!("{}.log", file_stem(job)))
    }

    fn open(&self, job: &GenerationJobId) -> Result<BufWriter<File>> {
        let path = self.path_for(job);
        debug!(path = %path.display(), "opening job log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open job log {}", path.display()))?;
        Ok(BufWriter::new(file))
    }
}

impl LogSink for FileLogSink {
    fn add_log(&self, job: &GenerationJobId, line: &str) {
        let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        if !writers.contains_key(job) {
            match self.open(job) {
                Ok(writer) => {
                    writers.insert(job.clone(), writer);
                }
                Err(e) => {
                    warn!(job = %job, err = %format!("{e:#}"), "failed to open job log");
                    return;
                }
            }
        }
        let Some(writer) = writers.get_mut(job) else {
            return;
        };
        if let Err(e) = writeln!(writer, "{line}") {
            warn!(job = %job, err = %e, "failed to write job log");
        } else if let Err(e) = writer.flush() {
            warn!(job = %job, err = %e, "failed to flush job log");
        }
    }

    fn close(&self, job: &GenerationJobId) {
        let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut writer) = writers.remove(job) {
            debug!(job = %job, "closing job log");
            if let Err(e) = writer.flush() {
                warn!(job = %job, err = %e, "failed to flush job log");
            }
        }
    }
}

fn file_stem(job: &GenerationJobId) -> String {
    let id = job.as_str();
    let plain = !id.is_empty()
        && !id.starts_with('.')
        && !id.starts_with("hex-")
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if plain {
        id.to_string()
    } else {
        format!("hex-{}", hex::encode(id))
    }
}

//! Tracing setup with a reopenable log file.
//!
//! When `daemon.log_path` is set, output goes to that file in append mode and
//! [`LogHandle::reopen`] swaps in a fresh handle after external rotation.
//! Otherwise output goes to stderr and reopening does nothing.

use objproxy_config::DaemonConfig;
use parking_lot::{Mutex, MutexGuard};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Append-mode log file shared by every tracing writer.
#[derive(Clone)]
pub struct LogFile {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl LogFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(open_append(path)?)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reopen the file at its configured path.
    ///
    /// On failure the previous handle stays in place.
    pub fn reopen(&self) -> io::Result<()> {
        let fresh = open_append(&self.path)?;
        let mut file = self.file.lock();
        let _ = file.flush();
        *file = fresh;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub struct LogFileWriter<'a>(MutexGuard<'a, File>);

impl Write for LogFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter(self.file.lock())
    }
}

/// Handle kept by the daemon to act on log rotation requests.
#[derive(Clone, Default)]
pub struct LogHandle {
    file: Option<LogFile>,
}

impl LogHandle {
    pub fn for_file(file: LogFile) -> Self {
        Self { file: Some(file) }
    }

    pub fn reopen(&self) -> io::Result<()> {
        match &self.file {
            Some(file) => file.reopen(),
            None => Ok(()),
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.file.as_ref().map(LogFile::path)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `daemon.log_level`; `verbose` forces
/// `debug` as the fallback level.
pub fn init(config: &DaemonConfig, verbose: bool) -> anyhow::Result<LogHandle> {
    let default_level = if verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let (writer, handle) = match &config.log_path {
        Some(path) => {
            let file = LogFile::open(path)?;
            (BoxMakeWriter::new(file.clone()), LogHandle::for_file(file))
        }
        None => (BoxMakeWriter::new(io::stderr), LogHandle::default()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(config.log_path.is_none())
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(handle)
}

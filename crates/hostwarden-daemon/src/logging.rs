use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use hostwarden_core::log_file_path;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Installs the global subscriber: human output on stderr plus an ANSI-free
/// copy appended to the daemon log file.
pub fn init(log_directory: &Path) -> Result<LogFile> {
    fs::create_dir_all(log_directory)
        .with_context(|| format!("create log dir {}", log_directory.display()))?;
    let log_file = LogFile::open(log_file_path(log_directory))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(log_file.clone()))
        .try_init()
        .context("install tracing subscriber")?;

    Ok(log_file)
}

/// Append-only handle to the daemon log that can be swapped for a fresh file
/// after logrotate has moved the old one away.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl LogFile {
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn reopen(&self) -> Result<()> {
        let file = open_append(&self.path)?;
        let mut guard = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = file;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter {
            file: Arc::clone(&self.file),
        }
    }
}

pub struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.flush()
    }
}

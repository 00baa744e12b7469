//! Console logging with a copy in the log file of the current run
//!
//! The subscriber writes every event to stdout and, while a [`RunLog`] is
//! open, appends the same line to `<run>/log_<run>.log`.

use crate::errors::{MgfError, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

static RUN_LOG: Mutex<Option<File>> = Mutex::new(None);

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `verbose`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(io::stdout.and(RunLogWriter::default))
        .try_init()
        .map_err(|e| MgfError::Generic(format!("Failed to initialize logging: {}", e)))
}

/// Writer appending to the open run log, a no-op while none is open
#[derive(Debug, Default)]
struct RunLogWriter;

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut guard) = RUN_LOG.lock() {
            if let Some(file) = guard.as_mut() {
                file.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Ok(mut guard) = RUN_LOG.lock() {
            if let Some(file) = guard.as_mut() {
                file.flush()?;
            }
        }
        Ok(())
    }
}

/// Guard tee'ing log output into a run log until dropped
#[derive(Debug)]
pub struct RunLog {
    _private: (),
}

impl RunLog {
    /// Start appending to `path`, replacing any run log opened before
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut guard = RUN_LOG
            .lock()
            .map_err(|_| MgfError::Generic("Run log lock poisoned".to_string()))?;
        *guard = Some(file);
        Ok(Self { _private: () })
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Ok(mut guard) = RUN_LOG.lock() {
            if let Some(mut file) = guard.take() {
                let _ = file.flush();
            }
        }
    }
}

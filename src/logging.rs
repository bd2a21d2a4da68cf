//! Debug logging to a private file.
//!
//! The terminal belongs to the renderer while a session runs, so log output
//! never goes to stdout or stderr. With `--debug`, events are written to
//! `$TMPDIR/barscope.log` (mode 0o600, truncated on start); `RUST_LOG`
//! overrides the default `debug` filter.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_MODE: u32 = 0o600;
const DEFAULT_FILTER: &str = "debug";

pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("barscope.log")
}

/// Create the log file owner-only, or truncate the user's existing one in
/// place.
pub fn open_log(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(LOG_MODE)
        .open(path)
        .or_else(|_| OpenOptions::new().write(true).truncate(true).open(path))
}

/// Install the file subscriber when `debug` is set. Returns the log path.
pub fn init(debug: bool) -> io::Result<Option<PathBuf>> {
    if !debug {
        return Ok(None);
    }
    let path = log_path();
    let file = open_log(&path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(Mutex::new(file))
        .try_init();
    if installed.is_err() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "a tracing subscriber is already installed",
        ));
    }
    Ok(Some(path))
}

//! Process-wide logging setup.
//!
//! File sink always: a fixed filename in the per-user temp directory,
//! truncated on every load. Events go through a `Mutex<File>` writer with no
//! buffering in between, so an abrupt `TerminateProcess` on a fatal setup
//! failure loses nothing. The stderr sink and debug-level filtering exist
//! only in debug mode.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use fakevive_core::SetupError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FILE_NAME: &str = "fakevive.log";

pub fn log_file_path() -> PathBuf {
    std::env::temp_dir().join(LOG_FILE_NAME)
}

pub fn init(debug: bool) -> Result<(), SetupError> {
    let path = log_file_path();
    let file = File::create(&path).map_err(|source| SetupError::LogSink {
        path: path.clone(),
        source,
    })?;

    let filter = EnvFilter::new(if debug { "debug" } else { "info" });
    let file_layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
    let console_layer = debug.then(|| fmt::layer().with_writer(std::io::stderr));

    // Attach fires once per process; try_init only fails when a test harness
    // already installed a subscriber, which is fine to ignore.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();
    Ok(())
}

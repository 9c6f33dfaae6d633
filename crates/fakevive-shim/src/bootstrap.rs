//! Process-attach initialization.
//!
//! A fixed sequence, each step depending on the previous: detect debug mode,
//! bring up logging, resolve the forwarding target, install the acquisition
//! hook. The first failure goes to [`crate::fatal::fail_fast`] and the
//! sequence never resumes.

use fakevive_core::SetupError;

use crate::{fatal, hook, logging, options, proxy};

pub fn initialize() {
    let debug = options::debug_requested();
    if let Err(err) = try_initialize(debug) {
        fatal::fail_fast(&err);
    }
}

fn try_initialize(debug: bool) -> Result<(), SetupError> {
    logging::init(debug)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        debug,
        log = %logging::log_file_path().display(),
        "FakeVive loaded"
    );
    proxy::resolve_system_ddraw()?;
    hook::install_acquisition_hook()?;
    Ok(())
}

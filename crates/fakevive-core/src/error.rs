//! The single fatal-setup error taxonomy.
//!
//! Every precondition the shim checks is a precondition for it to function at
//! all, so there is no recoverable kind. The variants exist to name the
//! specific failed step in the dialog the bootstrap layer raises before
//! terminating the process.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// A required library could not be brought into the process.
    #[error("failed to open {library}")]
    LoadLibrary { library: String },

    /// A named export was missing from a loaded module. The message carries
    /// the module path so the dialog can say where the lookup happened.
    #[error("failed to locate procedure {symbol} in {module}")]
    MissingExport {
        symbol: &'static str,
        module: String,
    },

    /// Registering the detour on the acquisition entry point failed.
    #[error("failed to hook {function}: {reason}")]
    CreateHook {
        function: &'static str,
        reason: String,
    },

    /// Enabling an already-registered detour failed.
    #[error("failed to enable {function} hook: {reason}")]
    EnableHook {
        function: &'static str,
        reason: String,
    },

    /// The dispatch-table slot could not be made writable. A patch that
    /// silently fails to apply is worse than terminating.
    #[error("failed to make dispatch slot at {addr:#x} writable")]
    UnprotectSlot { addr: usize },

    /// The original protection could not be restored after the slot write.
    #[error("failed to restore protection of dispatch slot at {addr:#x}")]
    ReprotectSlot { addr: usize },

    /// The log file sink could not be created.
    #[error("failed to create log file {path}: {source}")]
    LogSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_export_names_module_and_symbol() {
        let err = SetupError::MissingExport {
            symbol: "DirectDrawCreate",
            module: r"C:\Windows\System32\ddraw.dll".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DirectDrawCreate"));
        assert!(msg.contains(r"C:\Windows\System32\ddraw.dll"));
    }

    #[test]
    fn test_slot_errors_carry_address() {
        let err = SetupError::UnprotectSlot { addr: 0xdead_beef };
        assert!(err.to_string().contains("0xdeadbeef"));
    }
}

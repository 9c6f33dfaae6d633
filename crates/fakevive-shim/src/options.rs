//! Debug-mode detection.
//!
//! The flag below is the shim's entire runtime configuration surface: its
//! presence anywhere in the host's command line turns on the console sink
//! and debug-level logging. Debug builds have it fixed on.

pub const DEBUG_FLAG: &str = "-fakevive-debug";

pub fn command_line_has_flag(command_line: &str) -> bool {
    command_line.contains(DEBUG_FLAG)
}

pub fn debug_requested() -> bool {
    cfg!(debug_assertions) || command_line_has_flag(&host_command_line())
}

fn host_command_line() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}

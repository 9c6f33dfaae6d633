//! Fatal-error presentation: a modal dialog naming the failed step, then
//! unconditional process termination.
//!
//! A spoof that is only partially installed is indistinguishable from "not
//! installed" to the host, so there is no value in limping forward. Failures
//! are never returned to a caller and never retried.

use fakevive_core::SetupError;
use windows_sys::Win32::System::Threading::{GetCurrentProcess, TerminateProcess};
use windows_sys::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

pub const DIALOG_TITLE: &str = "FakeVive";

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

pub fn fail_fast(err: &SetupError) -> ! {
    tracing::error!(error = %err, "fatal setup failure");
    let text = wide(&err.to_string());
    let title = wide(DIALOG_TITLE);
    unsafe {
        MessageBoxW(
            std::ptr::null_mut(),
            text.as_ptr(),
            title.as_ptr(),
            MB_OK | MB_ICONERROR,
        );
        TerminateProcess(GetCurrentProcess(), 0);
    }
    // TerminateProcess on the current process does not return.
    std::process::abort()
}

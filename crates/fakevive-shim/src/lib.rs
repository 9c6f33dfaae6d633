//! # fakevive-shim
//!
//! A `ddraw.dll` proxy that makes an OpenVR host see an HTC Vive.
//!
//! Dropped next to the host executable, the shim occupies the `ddraw.dll`
//! load slot and forwards `DirectDrawCreate` to the system copy so the host
//! keeps working. On process attach it detours `VR_GetGenericInterface`;
//! the first successful `IVRSystem*` acquisition gets one dispatch-table
//! slot patched so every string-property query passes through the override
//! in `fakevive-core`.
//!
//! All interception logic lives in `fakevive-core`; this crate is the
//! Windows plumbing around it.

#![allow(clippy::missing_safety_doc)]

pub mod logging;
pub mod options;

#[cfg(windows)]
pub mod bootstrap;
#[cfg(windows)]
pub mod fatal;
#[cfg(windows)]
pub mod hook;
#[cfg(windows)]
pub mod proxy;

#[cfg(windows)]
use std::ffi::c_void;
#[cfg(windows)]
use windows_sys::Win32::Foundation::{BOOL, HMODULE, TRUE};
#[cfg(windows)]
use windows_sys::Win32::System::LibraryLoader::DisableThreadLibraryCalls;
#[cfg(windows)]
use windows_sys::Win32::System::SystemServices::DLL_PROCESS_ATTACH;

/// Process-attach entry point. Initialization runs exactly once, on attach;
/// thread notifications are disabled outright. Fatal setup failures never
/// return here (the process is gone), so the return value is always TRUE.
#[cfg(windows)]
#[no_mangle]
pub unsafe extern "system" fn DllMain(
    module: HMODULE,
    reason: u32,
    _reserved: *mut c_void,
) -> BOOL {
    if reason == DLL_PROCESS_ATTACH {
        DisableThreadLibraryCalls(module);
        bootstrap::initialize();
    }
    TRUE
}

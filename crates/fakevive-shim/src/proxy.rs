//! Exported-entry forwarding for the occupied `ddraw.dll` load slot.
//!
//! The shim is loaded in place of the system `ddraw.dll`, so it must keep the
//! host's existing dependency working: the system copy is loaded from the
//! real system directory and `DirectDrawCreate` forwards to it verbatim.
//! `DirectDrawCreate` is the only export opengl32-era hosts pull in.

use std::ffi::c_void;

use fakevive_core::{SavedSlot, SetupError};
use windows_sys::core::{GUID, HRESULT};
use windows_sys::Win32::Foundation::MAX_PATH;
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows_sys::Win32::System::SystemInformation::GetSystemDirectoryW;

type DirectDrawCreateFn =
    unsafe extern "system" fn(*mut GUID, *mut *mut c_void, *mut c_void) -> HRESULT;

const EXPORT_NAME: &str = "DirectDrawCreate";

static REAL_DIRECT_DRAW_CREATE: SavedSlot = SavedSlot::new();

/// Resolve the system implementation the forwarder delegates to. Runs during
/// process attach, before the host can reach the export; both failure modes
/// are fatal because the shim's load-compatibility depends on them.
pub fn resolve_system_ddraw() -> Result<(), SetupError> {
    let mut system_dir = [0u16; MAX_PATH as usize];
    let len = unsafe { GetSystemDirectoryW(system_dir.as_mut_ptr(), system_dir.len() as u32) };
    if len == 0 || len as usize >= system_dir.len() {
        return Err(SetupError::LoadLibrary {
            library: "the system directory".into(),
        });
    }

    let path = format!(
        "{}\\ddraw.dll",
        String::from_utf16_lossy(&system_dir[..len as usize])
    );
    let wide: Vec<u16> = path.encode_utf16().chain(std::iter::once(0)).collect();

    let module = unsafe { LoadLibraryW(wide.as_ptr()) };
    if module.is_null() {
        return Err(SetupError::LoadLibrary { library: path });
    }

    let real = unsafe { GetProcAddress(module, c"DirectDrawCreate".as_ptr() as *const u8) }
        .ok_or(SetupError::MissingExport {
            symbol: EXPORT_NAME,
            module: path.clone(),
        })?;

    REAL_DIRECT_DRAW_CREATE.store(real as *mut c_void);
    tracing::info!(module = %path, "forwarding target resolved");
    Ok(())
}

/// The shadowed export: forwards every call to the system implementation
/// unchanged. The target is resolved before the host gets control, so the
/// saved slot is always populated here.
#[no_mangle]
pub unsafe extern "system" fn DirectDrawCreate(
    guid: *mut GUID,
    dd_out: *mut *mut c_void,
    unk_outer: *mut c_void,
) -> HRESULT {
    let real: DirectDrawCreateFn = std::mem::transmute(REAL_DIRECT_DRAW_CREATE.get());
    real(guid, dd_out, unk_outer)
}

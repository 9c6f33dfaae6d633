//! The interface-acquisition detour and the live dispatch-table patch.
//!
//! `VR_GetGenericInterface` is the runtime's single factory for named
//! interfaces, so one detour observes every acquisition the host makes.
//! The replacement always calls the real factory first and hands its result
//! back untouched; the only side effect is the one-shot patch of the
//! device-system dispatch table on the first qualifying acquisition.

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;

use fakevive_core::acquire::{claim_patch, PatchState, GET_STRING_PROPERTY_SLOT};
use fakevive_core::props::query_with_override;
use fakevive_core::vtable::patch_instance_slot;
use fakevive_core::{ProtectionScope, SavedSlot, SetupError};
use once_cell::sync::OnceCell;
use retour::GenericDetour;
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryA};
use windows_sys::Win32::System::Memory::{VirtualProtect, PAGE_READWRITE};

const RUNTIME_MODULE: &str = "openvr_api.dll";
const ACQUIRE_SYMBOL: &str = "VR_GetGenericInterface";

type GetGenericInterfaceFn = extern "C" fn(*const c_char, *mut i32) -> *mut c_void;
type GetStringPropertyFn =
    extern "system" fn(*mut c_void, u32, i32, *mut c_char, u32, *mut i32) -> u32;

static PATCH_STATE: PatchState = PatchState::new();
static REAL_GET_STRING_PROPERTY: SavedSlot = SavedSlot::new();
static ACQUIRE_DETOUR: OnceCell<GenericDetour<GetGenericInterfaceFn>> = OnceCell::new();

/// `VirtualProtect`-backed protection scope. The slot sits in a read-only
/// page of the runtime; it is writable only between `make_writable` and
/// `restore`, never left open.
struct VirtualProtectScope;

impl ProtectionScope for VirtualProtectScope {
    fn make_writable(&self, addr: *mut c_void, len: usize) -> Result<u32, SetupError> {
        let mut old = 0u32;
        if unsafe { VirtualProtect(addr, len, PAGE_READWRITE, &mut old) } == 0 {
            return Err(SetupError::UnprotectSlot { addr: addr as usize });
        }
        Ok(old)
    }

    fn restore(&self, addr: *mut c_void, len: usize, token: u32) -> Result<(), SetupError> {
        let mut old = 0u32;
        if unsafe { VirtualProtect(addr, len, token, &mut old) } == 0 {
            return Err(SetupError::ReprotectSlot { addr: addr as usize });
        }
        Ok(())
    }
}

/// Detour `VR_GetGenericInterface`. Loading the runtime module here mirrors
/// the import the original host already carries; resolve, create and enable
/// are separate fatal steps so the dialog can name the one that failed.
pub fn install_acquisition_hook() -> Result<(), SetupError> {
    let module = unsafe { LoadLibraryA(c"openvr_api.dll".as_ptr() as *const u8) };
    if module.is_null() {
        return Err(SetupError::LoadLibrary {
            library: RUNTIME_MODULE.into(),
        });
    }

    let target = unsafe { GetProcAddress(module, c"VR_GetGenericInterface".as_ptr() as *const u8) }
        .ok_or(SetupError::MissingExport {
            symbol: ACQUIRE_SYMBOL,
            module: RUNTIME_MODULE.into(),
        })?;
    let target: GetGenericInterfaceFn = unsafe { std::mem::transmute(target) };

    let detour = unsafe { GenericDetour::new(target, acquire_replacement) }.map_err(|e| {
        SetupError::CreateHook {
            function: ACQUIRE_SYMBOL,
            reason: e.to_string(),
        }
    })?;

    // Stored before enabling: once enabled, any host thread may arrive in
    // the replacement and needs the trampoline.
    let detour = ACQUIRE_DETOUR.get_or_init(move || detour);
    unsafe { detour.enable() }.map_err(|e| SetupError::EnableHook {
        function: ACQUIRE_SYMBOL,
        reason: e.to_string(),
    })?;

    tracing::info!(target = ACQUIRE_SYMBOL, "acquisition hook enabled");
    Ok(())
}

/// Replacement for the acquisition entry point. The real call always runs
/// first with unmodified arguments and its result is returned unconditionally
/// — this hook changes memory, not return values.
extern "C" fn acquire_replacement(name: *const c_char, error: *mut i32) -> *mut c_void {
    let Some(detour) = ACQUIRE_DETOUR.get() else {
        return std::ptr::null_mut();
    };
    let instance = detour.call(name, error);
    if instance.is_null() || name.is_null() {
        return instance;
    }

    let requested = unsafe { CStr::from_ptr(name) };
    tracing::debug!(interface = ?requested, "interface acquired");
    if claim_patch(&PATCH_STATE, requested) {
        tracing::info!(interface = ?requested, "patching device-system dispatch table");
        let patched = unsafe {
            patch_instance_slot(
                instance,
                GET_STRING_PROPERTY_SLOT,
                get_string_property_replacement as *const c_void,
                &REAL_GET_STRING_PROPERTY,
                &VirtualProtectScope,
            )
        };
        if let Err(err) = patched {
            crate::fatal::fail_fast(&err);
        }
    }
    instance
}

/// Replacement for `IVRSystem::GetStringTrackedDeviceProperty`, installed in
/// the patched slot. The patcher saves the original before the slot write,
/// so delegation is always valid here.
extern "system" fn get_string_property_replacement(
    system: *mut c_void,
    device: u32,
    prop: i32,
    value: *mut c_char,
    capacity: u32,
    error: *mut i32,
) -> u32 {
    unsafe {
        query_with_override(prop, value, capacity, error, |v, cap, e| {
            let real: GetStringPropertyFn =
                std::mem::transmute(REAL_GET_STRING_PROPERTY.get());
            real(system, device, prop, v, cap, e)
        })
    }
}

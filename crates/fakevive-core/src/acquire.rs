//! Interface-acquisition decision logic.
//!
//! The runtime hands out polymorphic interfaces by versioned name
//! (`"IVRSystem_022"` and so on). We recognize the device-system family by
//! prefix so every version string qualifies, and claim the process-wide
//! patch exactly once: the dispatch table is shared across instances of the
//! underlying device-system singleton, so re-patching a later acquisition
//! would save our own replacement as "original".

use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Family prefix matching any version of the device-system interface.
pub const SYSTEM_INTERFACE_PREFIX: &str = "IVRSystem";

/// Dispatch-table slot of `GetStringTrackedDeviceProperty` in the
/// `IVRSystem` ABI. Fixed by the targeted runtime's header; if the ABI ever
/// shifts, patching this index would corrupt an unrelated slot, so treat a
/// runtime upgrade as a hard compatibility event.
pub const GET_STRING_PROPERTY_SLOT: usize = 0x1A;

pub fn is_system_interface(name: &CStr) -> bool {
    name.to_bytes().starts_with(SYSTEM_INTERFACE_PREFIX.as_bytes())
}

/// Process-wide record of whether the dispatch-table patch has been applied.
///
/// Claiming goes through a compare-exchange so that two host threads racing
/// through their first qualifying acquisition cannot both patch.
pub struct PatchState {
    applied: AtomicBool,
}

impl PatchState {
    pub const fn new() -> Self {
        Self {
            applied: AtomicBool::new(false),
        }
    }

    /// Claim the one-shot patch. Returns `true` for exactly one caller over
    /// the life of the process.
    pub fn try_claim(&self) -> bool {
        self.applied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_applied(&self) -> bool {
        self.applied.load(Ordering::Acquire)
    }
}

impl Default for PatchState {
    fn default() -> Self {
        Self::new()
    }
}

/// Decide whether a *successful* acquisition should trigger the patch, and
/// claim it if so. Callers invoke this only when the real acquisition call
/// returned a non-null instance.
pub fn claim_patch(state: &PatchState, name: &CStr) -> bool {
    is_system_interface(name) && state.try_claim()
}

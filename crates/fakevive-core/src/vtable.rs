//! One-shot dispatch-table patching.
//!
//! A polymorphic interface instance returned by the runtime carries a pointer
//! to its dispatch table in its first machine word. [`patch_instance_slot`]
//! swaps a single slot of that table for a replacement function pointer,
//! holding the page writable only for the duration of the write. The slot
//! offset is an ABI contract with the runtime; getting it wrong corrupts an
//! unrelated slot, which is why the offset is owned by the caller and this
//! module only ever touches the one slot it is given.
//!
//! Callers must guarantee at-most-once invocation per slot (see
//! [`crate::acquire::PatchState`]): patching twice would save the
//! already-replaced pointer as "original" and break delegation.

use std::ffi::c_void;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::error::SetupError;

/// Scoped control over write protection for a pointer-sized memory region.
///
/// The only seam through which the patcher touches page protection. The shim
/// backs it with `VirtualProtect`; tests use recording or failing fakes.
pub trait ProtectionScope {
    /// Make `len` bytes at `addr` writable. Returns an opaque token that
    /// captures the previous protection for [`restore`](Self::restore).
    fn make_writable(&self, addr: *mut c_void, len: usize) -> Result<u32, SetupError>;

    /// Restore the protection captured by `token`.
    fn restore(&self, addr: *mut c_void, len: usize, token: u32) -> Result<(), SetupError>;
}

/// Storage for a saved function pointer: written once when a patch or a
/// forwarding target is installed, only read afterwards.
pub struct SavedSlot {
    ptr: AtomicPtr<c_void>,
}

impl SavedSlot {
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    pub fn store(&self, f: *mut c_void) {
        self.ptr.store(f, Ordering::Release);
    }

    pub fn get(&self) -> *mut c_void {
        self.ptr.load(Ordering::Acquire)
    }

    pub fn is_set(&self) -> bool {
        !self.get().is_null()
    }
}

impl Default for SavedSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Swap one dispatch-table slot of `instance` for `replacement`.
///
/// The original pointer is stored into `saved` *before* the replacement is
/// written, so a host thread that races through the patched slot always finds
/// a valid delegation target.
///
/// # Safety
///
/// `instance` must point to a live polymorphic interface instance whose first
/// word is its dispatch table, and `slot_index` must be a valid index into
/// that table per the runtime's ABI. `replacement` must be a function pointer
/// signature-compatible with the slot it replaces.
pub unsafe fn patch_instance_slot<P: ProtectionScope>(
    instance: *mut c_void,
    slot_index: usize,
    replacement: *const c_void,
    saved: &SavedSlot,
    protection: &P,
) -> Result<(), SetupError> {
    let table = *(instance as *const *mut *mut c_void);
    let slot = table.add(slot_index);
    let len = std::mem::size_of::<*mut c_void>();

    let token = protection.make_writable(slot as *mut c_void, len)?;
    saved.store(*slot);
    *slot = replacement as *mut c_void;
    protection.restore(slot as *mut c_void, len, token)?;

    tracing::debug!(
        slot_index,
        original = ?saved.get(),
        ?replacement,
        "dispatch slot patched"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Fake instance: first word points at the dispatch table.
    struct FakeInstance {
        table: *mut *mut c_void,
    }

    fn entry(n: usize) -> *mut c_void {
        n as *mut c_void
    }

    struct NoopProtection;
    impl ProtectionScope for NoopProtection {
        fn make_writable(&self, _addr: *mut c_void, _len: usize) -> Result<u32, SetupError> {
            Ok(0)
        }
        fn restore(&self, _addr: *mut c_void, _len: usize, _token: u32) -> Result<(), SetupError> {
            Ok(())
        }
    }

    /// Records the order of protection calls against the slot write.
    struct RecordingProtection {
        calls: RefCell<Vec<&'static str>>,
    }
    impl ProtectionScope for RecordingProtection {
        fn make_writable(&self, _addr: *mut c_void, len: usize) -> Result<u32, SetupError> {
            assert_eq!(len, std::mem::size_of::<*mut c_void>());
            self.calls.borrow_mut().push("make_writable");
            Ok(0x20)
        }
        fn restore(&self, _addr: *mut c_void, _len: usize, token: u32) -> Result<(), SetupError> {
            assert_eq!(token, 0x20);
            self.calls.borrow_mut().push("restore");
            Ok(())
        }
    }

    struct FailingProtection;
    impl ProtectionScope for FailingProtection {
        fn make_writable(&self, addr: *mut c_void, _len: usize) -> Result<u32, SetupError> {
            Err(SetupError::UnprotectSlot { addr: addr as usize })
        }
        fn restore(&self, _addr: *mut c_void, _len: usize, _token: u32) -> Result<(), SetupError> {
            unreachable!("restore must not run when make_writable failed");
        }
    }

    #[test]
    fn test_patches_only_the_target_slot() {
        let mut table = vec![entry(1), entry(2), entry(3), entry(4)];
        let instance = FakeInstance {
            table: table.as_mut_ptr(),
        };
        let saved = SavedSlot::new();

        unsafe {
            patch_instance_slot(
                &instance as *const _ as *mut c_void,
                2,
                entry(0x99),
                &saved,
                &NoopProtection,
            )
            .unwrap();
        }

        assert_eq!(table, vec![entry(1), entry(2), entry(0x99), entry(4)]);
        assert_eq!(saved.get(), entry(3));
    }

    #[test]
    fn test_protection_brackets_the_write() {
        let mut table = vec![entry(7); 3];
        let instance = FakeInstance {
            table: table.as_mut_ptr(),
        };
        let saved = SavedSlot::new();
        let prot = RecordingProtection {
            calls: RefCell::new(Vec::new()),
        };

        unsafe {
            patch_instance_slot(
                &instance as *const _ as *mut c_void,
                0,
                entry(0x42),
                &saved,
                &prot,
            )
            .unwrap();
        }

        assert_eq!(*prot.calls.borrow(), ["make_writable", "restore"]);
    }

    #[test]
    fn test_protection_failure_leaves_table_untouched() {
        let mut table = vec![entry(11), entry(12)];
        let instance = FakeInstance {
            table: table.as_mut_ptr(),
        };
        let saved = SavedSlot::new();

        let err = unsafe {
            patch_instance_slot(
                &instance as *const _ as *mut c_void,
                1,
                entry(0x42),
                &saved,
                &FailingProtection,
            )
        }
        .unwrap_err();

        assert!(matches!(err, SetupError::UnprotectSlot { .. }));
        assert_eq!(table, vec![entry(11), entry(12)]);
        assert!(!saved.is_set());
    }

    #[test]
    fn test_saved_slot_is_write_once_read_many() {
        let saved = SavedSlot::new();
        assert!(!saved.is_set());
        saved.store(entry(5));
        assert!(saved.is_set());
        assert_eq!(saved.get(), entry(5));
    }
}

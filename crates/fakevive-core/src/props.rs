//! Property override logic.
//!
//! The replacement installed in the patched dispatch slot. It always performs
//! the real property query first and only rewrites the result when the real
//! call succeeded and the property is one of the two identity strings. The
//! reported size is the untruncated override length + 1 even when the
//! caller's buffer is short: the real API's query-for-size-then-query-for-
//! value idiom uses a short first call only to learn the needed size.

use std::ffi::CStr;
use std::os::raw::c_char;

/// `ETrackedDeviceProperty::Prop_ModelNumber_String`
pub const PROP_MODEL_NUMBER: i32 = 1001;
/// `ETrackedDeviceProperty::Prop_ManufacturerName_String`
pub const PROP_MANUFACTURER_NAME: i32 = 1005;
/// `ETrackedPropertyError::TrackedProp_Success`
pub const PROP_SUCCESS: i32 = 0;

pub const OVERRIDE_MANUFACTURER: &CStr = c"HTC";
pub const OVERRIDE_MODEL: &CStr = c"Vive";

/// The substitute string for a property, if it is one we spoof.
pub fn override_for(prop: i32) -> Option<&'static CStr> {
    match prop {
        PROP_MANUFACTURER_NAME => Some(OVERRIDE_MANUFACTURER),
        PROP_MODEL_NUMBER => Some(OVERRIDE_MODEL),
        _ => None,
    }
}

/// Copy `value` (terminator included) into the caller's buffer, truncated to
/// `capacity` bytes, the last written byte always NUL. Returns the
/// untruncated length + 1 regardless of truncation.
///
/// # Safety
///
/// `dst` must be valid for writes of `capacity` bytes, or null.
pub unsafe fn write_string_value(dst: *mut c_char, capacity: u32, value: &CStr) -> u32 {
    let bytes = value.to_bytes_with_nul();
    let reported = bytes.len() as u32;
    if dst.is_null() || capacity == 0 {
        return reported;
    }
    let n = bytes.len().min(capacity as usize);
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst as *mut u8, n);
    *dst.add(n - 1) = 0;
    reported
}

/// Perform the real query through `real`, then rewrite recognized identity
/// properties in place.
///
/// A zero size from the real call (failure or empty) is returned with the
/// buffer and error output exactly as the real call left them. Unrecognized
/// properties pass through byte-identically. On a rewrite, the error output
/// is forced to success: the real call's code no longer describes the
/// synthesized value.
///
/// # Safety
///
/// `value` must be valid for writes of `capacity` bytes (or null), and
/// `error` must be a valid output pointer or null, matching what `real`
/// itself requires.
pub unsafe fn query_with_override<F>(
    prop: i32,
    value: *mut c_char,
    capacity: u32,
    error: *mut i32,
    real: F,
) -> u32
where
    F: FnOnce(*mut c_char, u32, *mut i32) -> u32,
{
    let size = real(value, capacity, error);
    if size == 0 {
        return size;
    }
    let Some(replacement) = override_for(prop) else {
        return size;
    };
    let reported = write_string_value(value, capacity, replacement);
    if !error.is_null() {
        *error = PROP_SUCCESS;
    }
    tracing::debug!(prop, reported, "property rewritten");
    reported
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROP_BATTERY_PERCENTAGE: i32 = 1010;
    const ERR_NOT_SET: i32 = 109;

    /// A real call that fills the buffer with "XYZ\0" and reports success.
    fn real_xyz(value: *mut c_char, capacity: u32, error: *mut i32) -> u32 {
        unsafe {
            write_string_value(value, capacity, c"XYZ");
            if !error.is_null() {
                *error = PROP_SUCCESS;
            }
        }
        4
    }

    fn query(prop: i32, buf: &mut [u8], real: impl FnOnce(*mut c_char, u32, *mut i32) -> u32) -> (u32, i32) {
        let mut err = -1;
        let size = unsafe {
            query_with_override(
                prop,
                buf.as_mut_ptr() as *mut c_char,
                buf.len() as u32,
                &mut err,
                real,
            )
        };
        (size, err)
    }

    #[test]
    fn test_manufacturer_is_rewritten() {
        let mut buf = [0xaau8; 32];
        let (size, err) = query(PROP_MANUFACTURER_NAME, &mut buf, real_xyz);
        assert_eq!(size, 4); // "HTC" + terminator
        assert_eq!(&buf[..4], b"HTC\0");
        assert_eq!(err, PROP_SUCCESS);
    }

    #[test]
    fn test_model_is_rewritten() {
        let mut buf = [0u8; 32];
        let (size, err) = query(PROP_MODEL_NUMBER, &mut buf, real_xyz);
        assert_eq!(size, 5); // "Vive" + terminator
        assert_eq!(&buf[..5], b"Vive\0");
        assert_eq!(err, PROP_SUCCESS);
    }

    #[test]
    fn test_unrelated_property_passes_through() {
        let mut buf = [0u8; 32];
        let (size, err) = query(PROP_BATTERY_PERCENTAGE, &mut buf, real_xyz);
        assert_eq!(size, 4);
        assert_eq!(&buf[..4], b"XYZ\0");
        assert_eq!(err, PROP_SUCCESS);
    }

    #[test]
    fn test_failed_real_call_is_untouched() {
        let mut buf = [0x55u8; 8];
        let (size, err) = query(PROP_MANUFACTURER_NAME, &mut buf, |_, _, error| {
            unsafe { *error = ERR_NOT_SET };
            0
        });
        assert_eq!(size, 0);
        assert_eq!(err, ERR_NOT_SET);
        assert_eq!(buf, [0x55u8; 8]); // buffer exactly as the real call left it
    }

    #[test]
    fn test_short_buffer_truncates_but_reports_full_size() {
        let mut buf = [0xaau8; 2];
        let (size, _) = query(PROP_MANUFACTURER_NAME, &mut buf, real_xyz);
        assert_eq!(size, 4);
        assert_eq!(&buf[..], b"H\0"); // truncated to capacity, NUL-terminated
    }

    #[test]
    fn test_zero_capacity_reports_size_without_writing() {
        let size = unsafe {
            query_with_override(
                PROP_MODEL_NUMBER,
                std::ptr::null_mut(),
                0,
                std::ptr::null_mut(),
                |_, _, _| 1,
            )
        };
        assert_eq!(size, 5);
    }

    #[test]
    fn test_error_output_forced_to_success_on_rewrite() {
        let mut buf = [0u8; 16];
        let (size, err) = query(PROP_MODEL_NUMBER, &mut buf, |value, capacity, error| {
            unsafe {
                write_string_value(value, capacity, c"Rift");
                // Success with an unusual code; the override must not leak it.
                *error = 42;
            }
            5
        });
        assert_eq!(size, 5);
        assert_eq!(err, PROP_SUCCESS);
        assert_eq!(&buf[..5], b"Vive\0");
    }
}

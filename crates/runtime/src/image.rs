//! `Image`/`Value` attributes, array bound queries, and the handful of
//! arithmetic operations the generator can't just emit as a single
//! instruction (exponentiation, `abs`, dynamic allocation).
//!
//! `Image` returns an unconstrained `String`, so its result lives on the
//! secondary stack exactly the way a user function returning `String`
//! would; the caller's fat pointer stays valid until it releases back past
//! the mark it took before the call.

use crate::exceptions::{self, CONSTRAINT_ERROR};
use crate::sec_stack;

/// A `{ptr, len}` fat pointer, matching the generated IR's unconstrained
/// array/string representation.
#[repr(C)]
pub struct AdaString {
    pub ptr: *mut u8,
    pub len: i64,
}

/// `Integer'Image` — renders `value` as a decimal string on the secondary
/// stack.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_image_int(value: i64) -> AdaString {
    let text = value.to_string();
    let ptr = sec_stack::ada_rt_sec_stack_alloc(text.len() as i64);
    if !text.is_empty() {
        unsafe { std::ptr::copy_nonoverlapping(text.as_ptr(), ptr, text.len()) };
    }
    AdaString { ptr, len: text.len() as i64 }
}

/// `Integer'Value` — parses a decimal string passed indirectly (`text`
/// points at an in-memory `{ptr, len}` fat pointer, the calling convention
/// for an aggregate the generated IR passes by address), raising
/// `Constraint_Error` and returning 0 if it isn't a valid integer literal
/// once surrounding whitespace is trimmed.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_value_int(text: *const AdaString) -> i64 {
    if text.is_null() {
        exceptions::ada_rt_raise(CONSTRAINT_ERROR);
        return 0;
    }
    let AdaString { ptr, len } = unsafe { &*text };
    if ptr.is_null() || *len < 0 {
        exceptions::ada_rt_raise(CONSTRAINT_ERROR);
        return 0;
    }
    let bytes = unsafe { std::slice::from_raw_parts(*ptr, *len as usize) };
    let parsed = std::str::from_utf8(bytes)
        .ok()
        .map(str::trim)
        .and_then(|s| s.parse::<i64>().ok());
    match parsed {
        Some(n) => n,
        None => {
            exceptions::ada_rt_raise(CONSTRAINT_ERROR);
            0
        }
    }
}

/// The run-time bounds of an unconstrained array, read by `array_first`/
/// `array_last`/`array_length` out of the dope vector the caller passes a
/// pointer to.
#[repr(C)]
pub struct ArrayBounds {
    pub low: i64,
    pub high: i64,
}

/// `'First`/`'Last`/`'Length` for an unconstrained array whose bounds
/// aren't known until run time. Constrained arrays fold these to constants
/// at compile time instead of calling into the runtime at all.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_array_first(bounds: *const ArrayBounds) -> i64 {
    unsafe { (*bounds).low }
}

#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_array_last(bounds: *const ArrayBounds) -> i64 {
    unsafe { (*bounds).high }
}

#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_array_length(bounds: *const ArrayBounds) -> i64 {
    let ArrayBounds { low, high } = unsafe { &*bounds };
    if high < low {
        0
    } else {
        high - low + 1
    }
}

/// `abs` on a value whose sign isn't known to be non-negative at compile
/// time.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_abs(value: i64) -> i64 {
    value.wrapping_abs()
}

/// `**` on integers. Raises `Constraint_Error` on overflow, matching the
/// other arithmetic checks.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_pow_int(base: i64, exponent: i64) -> i64 {
    if exponent < 0 {
        exceptions::ada_rt_raise(CONSTRAINT_ERROR);
        return 0;
    }
    match base.checked_pow(exponent as u32) {
        Some(result) => result,
        None => {
            exceptions::ada_rt_raise(CONSTRAINT_ERROR);
            0
        }
    }
}

/// Heap allocation backing `new` allocator expressions for access types.
/// The generated IR already knows the designated type's size; this just
/// hands back zeroed, leaked storage (Ada access values have no implicit
/// deallocation, matching `Unchecked_Deallocation` being the only way to
/// free one).
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_alloc(size: i64) -> *mut u8 {
    let size = size.max(0) as usize;
    if size == 0 {
        return std::ptr::null_mut();
    }
    let mut storage = vec![0u8; size].into_boxed_slice();
    let ptr = storage.as_mut_ptr();
    std::mem::forget(storage);
    ptr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_int_renders_decimal() {
        let s = ada_rt_image_int(-42);
        let bytes = unsafe { std::slice::from_raw_parts(s.ptr, s.len as usize) };
        assert_eq!(bytes, b"-42");
    }

    #[test]
    fn value_int_round_trips_through_image() {
        let s = ada_rt_image_int(12345);
        let parsed = ada_rt_value_int(&s);
        assert_eq!(parsed, 12345);
        assert_eq!(exceptions::ada_rt_current_exception(), 0);
    }

    #[test]
    fn value_int_rejects_garbage() {
        let text = b"not a number";
        let s = AdaString { ptr: text.as_ptr() as *mut u8, len: text.len() as i64 };
        ada_rt_value_int(&s);
        assert_eq!(exceptions::ada_rt_current_exception(), CONSTRAINT_ERROR);
    }

    #[test]
    fn array_bounds_helpers() {
        let bounds = ArrayBounds { low: 3, high: 9 };
        assert_eq!(ada_rt_array_first(&bounds), 3);
        assert_eq!(ada_rt_array_last(&bounds), 9);
        assert_eq!(ada_rt_array_length(&bounds), 7);
        let empty = ArrayBounds { low: 9, high: 3 };
        assert_eq!(ada_rt_array_length(&empty), 0);
    }

    #[test]
    fn pow_int_checks_overflow() {
        assert_eq!(ada_rt_pow_int(2, 10), 1024);
        ada_rt_pow_int(2, 1000);
        assert_eq!(exceptions::ada_rt_current_exception(), CONSTRAINT_ERROR);
    }

    #[test]
    fn alloc_returns_zeroed_memory() {
        let ptr = ada_rt_alloc(8);
        assert!(!ptr.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(ptr, 8) };
        assert_eq!(bytes, &[0u8; 8]);
    }
}

//! `Text_IO`-equivalent console output.
//!
//! Strings crossing the C ABI use the fat-pointer layout from
//! `codegen::types` — a `{ptr, len}` pair — rather than a NUL terminator,
//! so every `put_*` here takes an explicit length.

use std::io::Write;
use std::slice;
use std::str;

/// Writes `len` bytes starting at `ptr` to standard output.
///
/// # Safety
/// `ptr` must point to at least `len` valid, initialized bytes.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_put_string(ptr: *const u8, len: i64) {
    if ptr.is_null() || len <= 0 {
        return;
    }
    let bytes = unsafe { slice::from_raw_parts(ptr, len as usize) };
    let text = String::from_utf8_lossy(bytes);
    print!("{text}");
    let _ = std::io::stdout().flush();
}

/// Writes an integer in Ada's `Integer'Image` style (no leading space for
/// non-negative values, since the generated IR already right-pads/aligns
/// as needed at the call site).
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_put_int(value: i64) {
    print!("{value}");
    let _ = std::io::stdout().flush();
}

/// Writes a floating-point value.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_put_float(value: f64) {
    print!("{value}");
    let _ = std::io::stdout().flush();
}

/// Emits a line terminator.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_new_line() {
    println!();
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_string_handles_null_and_empty_input_without_panicking() {
        ada_rt_put_string(std::ptr::null(), 0);
        ada_rt_put_string(std::ptr::null(), 5);
        let bytes = b"";
        ada_rt_put_string(bytes.as_ptr(), 0);
    }

    #[test]
    fn put_string_prints_valid_utf8() {
        let bytes = b"hello";
        ada_rt_put_string(bytes.as_ptr(), bytes.len() as i64);
    }
}

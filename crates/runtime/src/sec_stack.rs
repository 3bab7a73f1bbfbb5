//! Secondary stack.
//!
//! Backs function results whose size isn't known until run time — returned
//! unconstrained arrays and strings. Each thread owns one arena; `mark`
//! records the current high-water line, `alloc` bumps it, and `release`
//! resets it back to a previous mark. Callers always release in the reverse
//! order they marked, so a plain growable buffer is enough — nothing here
//! needs to free memory to the allocator until the thread exits.
//!
//! `mark`/`release` trade in `ptr`-typed tokens rather than raw offsets so
//! they share the generic handle type the rest of the ABI uses for opaque
//! state, but the value is never dereferenced — it's the byte offset at
//! which the arena stood, smuggled through a pointer-sized integer.

use std::cell::RefCell;

thread_local! {
    static SEC_STACK: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

/// Returns the current top of the secondary stack, to be passed back to
/// [`ada_rt_sec_stack_release`] once the allocations made after this mark
/// are no longer needed.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_sec_stack_mark() -> *mut u8 {
    SEC_STACK.with(|s| s.borrow().len() as *mut u8)
}

/// Bumps the secondary stack by `size` bytes and returns a pointer to the
/// start of the new region. The region is zero-initialized.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_sec_stack_alloc(size: i64) -> *mut u8 {
    let size = size.max(0) as usize;
    SEC_STACK.with(|s| {
        let mut s = s.borrow_mut();
        let start = s.len();
        s.resize(start + size, 0);
        // SAFETY: `start` is within bounds of the buffer we just grew, and
        // the buffer outlives the returned pointer for as long as no
        // intervening release/alloc call shrinks or reallocates past it.
        unsafe { s.as_mut_ptr().add(start) }
    })
}

/// Truncates the secondary stack back to a previous mark, invalidating any
/// pointers returned by allocations made since that mark.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_sec_stack_release(mark: *mut u8) {
    let mark = mark as usize;
    SEC_STACK.with(|s| {
        let mut s = s.borrow_mut();
        if mark <= s.len() {
            s.truncate(mark);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_grows_from_the_current_mark() {
        let mark = ada_rt_sec_stack_mark() as usize;
        let ptr = ada_rt_sec_stack_alloc(16);
        assert!(!ptr.is_null());
        assert_eq!(ada_rt_sec_stack_mark() as usize, mark + 16);
        ada_rt_sec_stack_release(mark as *mut u8);
        assert_eq!(ada_rt_sec_stack_mark() as usize, mark);
    }

    #[test]
    fn release_is_a_no_op_when_mark_is_already_past() {
        let mark = ada_rt_sec_stack_mark() as usize;
        ada_rt_sec_stack_release((mark + 1000) as *mut u8);
        assert_eq!(ada_rt_sec_stack_mark() as usize, mark);
    }
}

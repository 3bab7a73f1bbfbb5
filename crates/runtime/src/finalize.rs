//! Finalization.
//!
//! Controlled types register a finalizer when they come into scope; the
//! block that declared them runs `finalize_all` on every exit path (normal
//! return, `exit`, or exception propagation) so `Finalize` always runs even
//! when the block is left abnormally.

use std::cell::RefCell;

type Finalizer = extern "C" fn(*mut u8);

thread_local! {
    static FINALIZERS: RefCell<Vec<(Finalizer, *mut u8)>> = const { RefCell::new(Vec::new()) };
}

/// Registers `finalizer` to be called with `context` the next time
/// [`ada_rt_finalize_all`] runs.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_finalize_push(finalizer: Finalizer, context: *mut u8) {
    FINALIZERS.with(|f| f.borrow_mut().push((finalizer, context)));
}

/// Runs every registered finalizer in reverse (most-recently-declared-first)
/// order, then clears the list. Finalizers registered by a finalizer that
/// runs during this call are also run before it returns.
///
/// `_scope` is reserved for a future scope-limited form (finalizing only
/// what was pushed since a given mark); every block currently finalizes the
/// whole pending list, which is correct as long as blocks that declare
/// controlled objects don't nest finalizers across an intervening block
/// that itself runs to completion without finalizing.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_finalize_all(_scope: *mut u8) {
    loop {
        let next = FINALIZERS.with(|f| f.borrow_mut().pop());
        match next {
            Some((finalizer, context)) => finalizer(context),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    thread_local! {
        static CALLS: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
    }

    extern "C" fn record(ctx: *mut u8) {
        CALLS.with(|c| c.borrow_mut().push(ctx as usize as u8));
    }

    #[test]
    fn finalizers_run_in_reverse_registration_order() {
        CALLS.with(|c| c.borrow_mut().clear());
        ada_rt_finalize_push(record, 1 as *mut u8);
        ada_rt_finalize_push(record, 2 as *mut u8);
        ada_rt_finalize_all(std::ptr::null_mut());
        CALLS.with(|c| assert_eq!(*c.borrow(), vec![2, 1]));
    }

    #[test]
    fn finalize_all_is_idempotent_when_nothing_is_registered() {
        ada_rt_finalize_all(std::ptr::null_mut());
    }
}

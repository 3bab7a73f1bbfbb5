//! Exception frames.
//!
//! The code generator brackets every block that has handlers with a
//! `frame_push`/`frame_pop` pair and checks `current_exception` right after
//! the pop to decide whether to fall into one of the inlined handler
//! bodies. Raising just records which exception is pending; unwinding the
//! intervening calls back up to the nearest handler is the generated IR's
//! job (every risky call is followed by a check), not this module's.

use std::cell::Cell;

/// `Constraint_Error` — range, index, null, and discriminant checks raise
/// this. These identities must match `adac::types::EXC_*` exactly: the
/// generated code's handler dispatch compares `ada_rt_current_exception()`
/// against those constants, not these.
pub const CONSTRAINT_ERROR: i64 = 1;
/// `Numeric_Error` — division and overflow checks raise this.
pub const NUMERIC_ERROR: i64 = 2;
/// `Program_Error` — e.g. falling off the end of a function without a
/// return, or an unhandled `case` choice.
pub const PROGRAM_ERROR: i64 = 3;
/// `Storage_Error` — secondary-stack or heap exhaustion.
pub const STORAGE_ERROR: i64 = 4;
/// `Tasking_Error` — a rendezvous partner terminated abnormally.
pub const TASKING_ERROR: i64 = 5;

thread_local! {
    static FRAME_STACK: Cell<u64> = const { Cell::new(0) };
    static NEXT_FRAME_ID: Cell<u64> = const { Cell::new(1) };
    static CURRENT_EXCEPTION: Cell<i64> = const { Cell::new(0) };
    static LAST_RAISED: Cell<i64> = const { Cell::new(0) };
}

/// Pushes a new exception frame and returns an opaque token identifying it,
/// to be passed back to [`ada_rt_frame_pop`]. The token is a pointer-sized
/// integer, never dereferenced as an actual pointer.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_frame_push() -> *mut u8 {
    let id = NEXT_FRAME_ID.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    });
    FRAME_STACK.with(|f| f.set(id));
    id as *mut u8
}

/// Pops the frame identified by `token`. Frames nest strictly with block
/// scope, so this is just bookkeeping — the interesting state is
/// `current_exception`, which the caller checks right after this returns.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_frame_pop(_token: *mut u8) {}

/// Raises `exception_id`, making it the pending exception for this thread.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_raise(exception_id: i64) {
    LAST_RAISED.with(|e| e.set(exception_id));
    CURRENT_EXCEPTION.with(|e| e.set(exception_id));
}

/// Re-raises whatever exception this thread most recently raised — used by
/// a handler's bare `raise;` statement.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_reraise() {
    let last = LAST_RAISED.with(Cell::get);
    CURRENT_EXCEPTION.with(|e| e.set(last));
}

/// Reads and clears the pending exception for this thread. Returns 0 when
/// there is none. Generated handler dispatch calls this exactly once per
/// frame pop to decide which (if any) handler body to run.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_current_exception() -> i64 {
    CURRENT_EXCEPTION.with(|e| {
        let pending = e.get();
        e.set(0);
        pending
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_then_current_exception_reads_and_clears() {
        ada_rt_raise(CONSTRAINT_ERROR);
        assert_eq!(ada_rt_current_exception(), CONSTRAINT_ERROR);
        assert_eq!(ada_rt_current_exception(), 0);
    }

    #[test]
    fn reraise_replays_the_last_raised_exception_after_it_was_cleared() {
        ada_rt_raise(PROGRAM_ERROR);
        assert_eq!(ada_rt_current_exception(), PROGRAM_ERROR);
        ada_rt_reraise();
        assert_eq!(ada_rt_current_exception(), PROGRAM_ERROR);
    }

    #[test]
    fn frame_tokens_are_unique() {
        let a = ada_rt_frame_push();
        let b = ada_rt_frame_push();
        assert_ne!(a, b);
        ada_rt_frame_pop(b);
        ada_rt_frame_pop(a);
    }

    #[test]
    fn frame_id_zero_is_never_issued() {
        assert!(!ada_rt_frame_push().is_null());
    }
}

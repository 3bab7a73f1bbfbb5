//! Tasking and rendezvous.
//!
//! Each Ada task maps onto one OS thread, identified across the ABI by the
//! leaked pointer to its [`TaskHandle`]. A `entry_call`/`accept` pair is a
//! classic rendezvous: the caller blocks on a condition variable until an
//! accepting task picks its call off the entry's queue and completes it.
//! This is plain `std::thread`/`std::sync`, not a green-thread scheduler —
//! Ada tasks are typically few and long-lived compared to Seq's strands, so
//! there's no call for a coroutine runtime here.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::Duration;

use crate::exceptions::{self, TASKING_ERROR};

/// An Ada task entry point, called with the single `context` pointer the
/// creator passed to [`ada_rt_task_start`].
pub type TaskEntry = extern "C" fn(*mut u8);

struct SendPtr(*mut u8);
unsafe impl Send for SendPtr {}

struct PendingCall {
    args: *mut i64,
    completed: Arc<(Mutex<bool>, Condvar)>,
}
unsafe impl Send for PendingCall {}

struct TaskHandle {
    queues: Mutex<HashMap<i32, Vec<PendingCall>>>,
    queue_cv: Condvar,
    aborted: Mutex<bool>,
}

/// Rendezvous calls an accepting task has popped off its queue but not yet
/// completed, keyed by the i32 token handed back from `accept_wait`/`try`.
fn accepted_calls() -> &'static Mutex<HashMap<i32, PendingCall>> {
    static ACCEPTED: OnceLock<Mutex<HashMap<i32, PendingCall>>> = OnceLock::new();
    ACCEPTED.get_or_init(|| Mutex::new(HashMap::new()))
}

fn next_token() -> i32 {
    static NEXT: AtomicI32 = AtomicI32::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn next_task_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
    static CURRENT_TASK: Cell<*mut u8> = const { Cell::new(std::ptr::null_mut()) };
}

/// # Safety
/// `task` must be a pointer returned by [`ada_rt_task_start`] that hasn't
/// been freed — which, since task handles are intentionally leaked for the
/// life of the process, is true for any value this module ever hands out.
unsafe fn task_handle<'a>(task: *mut u8) -> Option<&'a TaskHandle> {
    if task.is_null() {
        None
    } else {
        Some(unsafe { &*(task as *const TaskHandle) })
    }
}

/// Starts a new task running `entry(context)` on its own OS thread and
/// returns a handle other tasks use to call its entries or abort it.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_task_start(entry: TaskEntry, context: *mut u8) -> *mut u8 {
    let handle = Box::into_raw(Box::new(TaskHandle {
        queues: Mutex::new(HashMap::new()),
        queue_cv: Condvar::new(),
        aborted: Mutex::new(false),
    }));
    let handle_addr = SendPtr(handle as *mut u8);
    let ctx = SendPtr(context);
    let task_id = next_task_id();

    std::thread::Builder::new()
        .name(format!("ada-task-{task_id}"))
        .spawn(move || {
            CURRENT_TASK.with(|c| c.set(handle_addr.0));
            let ctx = ctx;
            entry(ctx.0);
        })
        .expect("failed to spawn task thread");

    handle as *mut u8
}

/// Requests that `task` terminate at its next abort-completion point. Any
/// entry calls already queued against it continue to wait — an aborted
/// task is expected to drain or reject them itself before exiting.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_task_abort(task: *mut u8) {
    if let Some(handle) = unsafe { task_handle(task) } {
        *handle.aborted.lock().unwrap() = true;
        handle.queue_cv.notify_all();
    }
}

/// Suspends the calling task for `seconds`.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_delay(seconds: f64) {
    if seconds > 0.0 {
        std::thread::sleep(Duration::from_secs_f64(seconds));
    }
}

/// Calls entry `entry_id` on `task`, blocking until an `accept` completes
/// it. `args` points to the call's in/out parameter buffer, whose layout
/// (including where a function entry's result lives) is fixed by the
/// generated IR at both ends of the rendezvous. Raises `Tasking_Error` if
/// the task handle is null or has already terminated.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_entry_call(task: *mut u8, entry_id: i32, args: *mut i64) {
    let Some(handle) = (unsafe { task_handle(task) }) else {
        exceptions::ada_rt_raise(TASKING_ERROR);
        return;
    };

    let completed = Arc::new((Mutex::new(false), Condvar::new()));
    {
        let mut queues = handle.queues.lock().unwrap();
        queues.entry(entry_id).or_default().push(PendingCall {
            args,
            completed: Arc::clone(&completed),
        });
    }
    handle.queue_cv.notify_all();

    let (lock, cv) = &*completed;
    let mut done = lock.lock().unwrap();
    while !*done {
        done = cv.wait(done).unwrap();
    }
}

fn pop_pending_call(entry_id: i32, blocking: bool) -> Option<PendingCall> {
    let task = CURRENT_TASK.with(Cell::get);
    let handle = unsafe { task_handle(task) }?;

    let mut queues = handle.queues.lock().unwrap();
    loop {
        if let Some(queue) = queues.get_mut(&entry_id)
            && !queue.is_empty()
        {
            return Some(queue.remove(0));
        }
        if !blocking || *handle.aborted.lock().unwrap() {
            return None;
        }
        queues = handle.queue_cv.wait(queues).unwrap();
    }
}

/// Blocks the calling task until a call to entry `entry_id` arrives, then
/// returns a token identifying it — pass the token to
/// [`ada_rt_accept_args`] to read the call's parameters and to
/// [`ada_rt_accept_complete`] once the accept's body has run.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_accept_wait(entry_id: i32) -> i32 {
    match pop_pending_call(entry_id, true) {
        Some(call) => {
            let token = next_token();
            accepted_calls().lock().unwrap().insert(token, call);
            token
        }
        None => 0,
    }
}

/// Like [`ada_rt_accept_wait`] but returns 0 immediately instead of
/// blocking when no call is pending — used by `select` to probe entries.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_accept_try(entry_id: i32) -> i32 {
    match pop_pending_call(entry_id, false) {
        Some(call) => {
            let token = next_token();
            accepted_calls().lock().unwrap().insert(token, call);
            token
        }
        None => 0,
    }
}

/// Returns the argument buffer for the call accepted under `token`.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_accept_args(token: i32) -> *mut i64 {
    accepted_calls()
        .lock()
        .unwrap()
        .get(&token)
        .map(|c| c.args)
        .unwrap_or(std::ptr::null_mut())
}

/// Completes the rendezvous accepted under `token`, waking its caller.
#[unsafe(no_mangle)]
pub extern "C" fn ada_rt_accept_complete(token: i32) {
    let Some(call) = accepted_calls().lock().unwrap().remove(&token) else {
        return;
    };
    let (lock, cv) = &*call.completed;
    *lock.lock().unwrap() = true;
    cv.notify_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI64;

    static SEEN: AtomicI64 = AtomicI64::new(0);

    extern "C" fn server(_ctx: *mut u8) {
        let token = ada_rt_accept_wait(7);
        assert_ne!(token, 0);
        let args = ada_rt_accept_args(token);
        assert!(!args.is_null());
        let arg0 = unsafe { *args };
        SEEN.store(arg0, Ordering::SeqCst);
        unsafe { *args = arg0 * 2 };
        ada_rt_accept_complete(token);
    }

    #[test]
    fn entry_call_rendezvous_with_accept_wait() {
        let task = ada_rt_task_start(server, std::ptr::null_mut());
        let mut buf = [21i64];
        ada_rt_entry_call(task, 7, buf.as_mut_ptr());
        assert_eq!(buf[0], 42);
        assert_eq!(SEEN.load(Ordering::SeqCst), 21);
    }

    #[test]
    fn entry_call_on_a_null_task_raises_tasking_error() {
        let mut buf = [0i64];
        ada_rt_entry_call(std::ptr::null_mut(), 1, buf.as_mut_ptr());
        assert_eq!(exceptions::ada_rt_current_exception(), TASKING_ERROR);
    }

    #[test]
    fn accept_try_returns_zero_when_nothing_is_pending() {
        CURRENT_TASK.with(|c| c.set(std::ptr::null_mut()));
        assert_eq!(ada_rt_accept_try(123), 0);
    }
}

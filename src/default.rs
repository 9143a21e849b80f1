//! The thread-shared default event loop.
//!
//! Mirrors the engine's notion of an implicitly shared instance: one default
//! loop per thread, created lazily on first use and alive until the thread
//! exits. [`run_default`] and [`run_once_default`] drive it without
//! constructing a [`Loop`](crate::Loop) handle; handles created with
//! [`Loop::default_loop`](crate::Loop::default_loop) observe the very same
//! instance.
//!
//! The default instance is per-thread rather than process-wide because the
//! engine is single-threaded; two threads calling into this module drive two
//! independent instances and never contend.

use std::cell::RefCell;

use log::debug;

use crate::event_loop::LoopState;

thread_local! {
    static DEFAULT: RefCell<Option<LoopState>> = const { RefCell::new(None) };
}

/// Runs this thread's default loop with the shared instance borrowed for the
/// duration of `f`.
///
/// # Panics
///
/// Panics if the shared instance cannot be initialized, or when re-entered
/// from a callback the default loop itself is dispatching.
pub(crate) fn with_default<R>(f: impl FnOnce(&mut LoopState) -> R) -> R {
    DEFAULT.with(|slot| {
        let mut slot = slot.borrow_mut();
        let state = slot.get_or_insert_with(|| {
            debug!("initialized default event loop for this thread");
            LoopState::new().expect("evloop: failed to initialize the default event loop")
        });
        f(state)
    })
}

/// Forces initialization of this thread's default instance.
pub(crate) fn ensure_init() {
    with_default(|_| ());
}

/// Runs the thread's default loop until a callback raises its stop signal,
/// exactly as [`Loop::run`](crate::Loop::run) would on a handle created with
/// [`Loop::default_loop`](crate::Loop::default_loop).
///
/// Returns `true` if the engine reported success, `false` otherwise; after a
/// `false` return the cause is available through
/// [`Loop::last_error`](crate::Loop::last_error) on any default handle.
///
/// Never constructs or destroys a handle and never releases the shared
/// instance.
pub fn run_default() -> bool {
    with_default(|state| state.run())
}

/// Performs a single blocking iteration of the thread's default loop, with
/// the same semantics and return-value convention as
/// [`Loop::run_once`](crate::Loop::run_once).
pub fn run_once_default() -> bool {
    with_default(|state| state.run_once())
}

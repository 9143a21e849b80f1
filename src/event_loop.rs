//! The owning event loop handle.
//!
//! [`Loop`] wraps one instance of the underlying engine and forwards the
//! control operations to it. The handle either owns a fresh engine instance
//! exclusively or borrows the thread-shared default instance; only the owned
//! form releases engine resources when it goes away.

use std::time::{Duration, Instant};

use calloop::{EventLoop, LoopHandle, LoopSignal};
use log::debug;
use metrics::counter;

use crate::error::LoopError;

/// Everything the facade keeps per engine instance: the engine itself, its
/// stop signal, the cached loop clock, and the last error it reported.
pub(crate) struct LoopState {
    engine: EventLoop<'static, ()>,
    signal: LoopSignal,
    epoch: Instant,
    cached_ms: u64,
    last_error: Option<LoopError>,
}

impl LoopState {
    /// Initializes a fresh engine instance with a zeroed clock.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the polling backend cannot be set up.
    pub(crate) fn new() -> Result<Self, LoopError> {
        let engine = EventLoop::try_new().map_err(LoopError::from)?;
        let signal = engine.get_signal();
        counter!("evloop_loops_created_total").increment(1);

        Ok(LoopState {
            engine,
            signal,
            epoch: Instant::now(),
            cached_ms: 0,
            last_error: None,
        })
    }

    /// Non-owning engine handle for registering event sources.
    pub(crate) fn handle(&self) -> LoopHandle<'static, ()> {
        self.engine.handle()
    }

    /// Clone of the engine's stop signal.
    pub(crate) fn signal(&self) -> LoopSignal {
        self.signal.clone()
    }

    /// Dispatches iterations until the engine's stop signal is raised.
    pub(crate) fn run(&mut self) -> bool {
        counter!("evloop_runs_total").increment(1);
        self.refresh_time();

        let epoch = self.epoch;
        let cached_ms = &mut self.cached_ms;
        let result = self.engine.run(None::<Duration>, &mut (), |_| {
            // The engine refreshes the loop clock once per iteration.
            *cached_ms = epoch.elapsed().as_millis() as u64;
            counter!("evloop_iterations_total").increment(1);
        });

        match result {
            Ok(()) => true,
            Err(err) => {
                self.last_error = Some(LoopError::from(err));
                false
            }
        }
    }

    /// Performs exactly one dispatch iteration.
    pub(crate) fn run_once(&mut self) -> bool {
        self.refresh_time();
        // Block here until at least one source becomes ready.
        let result = self.engine.dispatch(None::<Duration>, &mut ());
        self.refresh_time();
        counter!("evloop_iterations_total").increment(1);

        match result {
            Ok(()) => true,
            Err(err) => {
                self.last_error = Some(LoopError::from(err));
                false
            }
        }
    }

    pub(crate) fn update_time(&mut self) {
        self.refresh_time();
    }

    pub(crate) fn now(&self) -> u64 {
        self.cached_ms
    }

    pub(crate) fn last_error(&self) -> Option<LoopError> {
        self.last_error.clone()
    }

    fn refresh_time(&mut self) {
        self.cached_ms = self.epoch.elapsed().as_millis() as u64;
    }
}

enum Inner {
    /// Exclusively owned engine instance. Emptied by `close`, so a second
    /// release attempt finds nothing to do.
    Owned(Option<Box<LoopState>>),
    /// Borrowed view of the thread-shared default instance. Never releases
    /// it; the instance belongs to the thread.
    Default,
}

/// An owning handle to one event loop instance.
///
/// A `Loop` either owns a fresh, independent engine instance ([`Loop::new`])
/// or borrows the thread-shared default instance ([`Loop::default_loop`]).
/// The handle is move-only: duplicating it would produce two owners of one
/// engine instance, so there is no `Clone`. It is also not `Send`; a loop
/// lives and dies on the thread that created it.
///
/// Collaborator components (timers, channels, fd-backed sources) attach to a
/// specific loop through [`Loop::handle`], which hands out the engine's own
/// non-owning handle type.
pub struct Loop {
    inner: Inner,
}

impl Loop {
    /// Creates a handle that owns a brand-new, independent engine instance.
    ///
    /// Work scheduled on this instance is invisible to every other loop.
    /// Dropping (or [`close`](Loop::close)-ing) the handle releases the
    /// engine and invalidates any sources still registered against it; no
    /// reference counting is performed on the handle's behalf.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the polling backend cannot be set up.
    pub fn new() -> Result<Self, LoopError> {
        let state = LoopState::new()?;
        debug!("created owned event loop");

        Ok(Loop {
            inner: Inner::Owned(Some(Box::new(state))),
        })
    }

    /// Creates a handle onto the thread-shared default instance,
    /// initializing that instance if this thread has not used it yet.
    ///
    /// Any number of default handles may coexist on one thread; they all
    /// observe the same instance, the same registered sources and the same
    /// loop clock. Dropping a default handle never releases the shared
    /// instance. See the [`default`](crate::default) module for the
    /// free-function entry points onto the same instance.
    ///
    /// # Panics
    ///
    /// Panics if the shared instance cannot be initialized; there is no
    /// caller-owned instance to hand an error to on this path.
    pub fn default_loop() -> Self {
        crate::default::ensure_init();

        Loop {
            inner: Inner::Default,
        }
    }

    /// Returns the engine's native handle for this instance.
    ///
    /// The handle is cloneable and non-owning: collaborators use it to
    /// insert event sources against this specific loop, and its validity is
    /// bounded by the instance's lifetime. Releasing the loop out from under
    /// registered sources invalidates them.
    ///
    /// # Panics
    ///
    /// Panics if called on an owned handle after [`close`](Loop::close).
    pub fn handle(&self) -> LoopHandle<'static, ()> {
        self.with_state_ref(|state| state.handle())
    }

    /// Returns a clone of the engine's stop signal.
    ///
    /// Stop semantics belong to the engine; this merely forwards its own
    /// mechanism so a callback can end a [`run`](Loop::run) in progress.
    ///
    /// # Panics
    ///
    /// Panics if called on an owned handle after [`close`](Loop::close).
    pub fn signal(&self) -> LoopSignal {
        self.with_state_ref(|state| state.signal())
    }

    /// Runs the loop until a callback raises the engine's stop signal.
    ///
    /// Blocks the calling thread for the duration: the engine polls for
    /// readiness, dispatches whatever becomes ready, and keeps iterating.
    /// The engine does not track an active-work count, so termination comes
    /// from [`signal`](Loop::signal) rather than from the queue draining.
    ///
    /// # Returns
    ///
    /// `true` if the engine reported success, `false` otherwise. After a
    /// `false` return, [`last_error`](Loop::last_error) carries the cause.
    ///
    /// # Panics
    ///
    /// Panics if called on an owned handle after [`close`](Loop::close).
    pub fn run(&mut self) -> bool {
        self.with_state(|state| state.run())
    }

    /// Performs a single iteration: polls once, blocking if nothing is
    /// currently ready, dispatches whatever became ready, then returns.
    ///
    /// # Returns
    ///
    /// `true` if the engine reported success for the iteration, consistent
    /// with [`run`](Loop::run). A `true` return does not imply that no more
    /// work remains scheduled.
    ///
    /// # Panics
    ///
    /// Panics if called on an owned handle after [`close`](Loop::close).
    pub fn run_once(&mut self) -> bool {
        self.with_state(|state| state.run_once())
    }

    /// Refreshes the cached loop clock to the instant of the call.
    ///
    /// Subsequent [`now`](Loop::now) reads reflect this instant until the
    /// next refresh, whether explicit or performed internally by
    /// [`run`](Loop::run) / [`run_once`](Loop::run_once).
    ///
    /// # Panics
    ///
    /// Panics if called on an owned handle after [`close`](Loop::close).
    pub fn update_time(&mut self) {
        self.with_state(|state| state.update_time());
    }

    /// Returns the cached loop clock in whole milliseconds since this
    /// instance was created.
    ///
    /// The clock is monotonic, not wall-clock time, and is not refreshed by
    /// this call: it reflects the most recent
    /// [`update_time`](Loop::update_time) or internal refresh.
    ///
    /// # Panics
    ///
    /// Panics if called on an owned handle after [`close`](Loop::close).
    pub fn now(&self) -> u64 {
        self.with_state_ref(|state| state.now())
    }

    /// Returns the most recent error record the engine produced for this
    /// instance, or `None` if none was recorded.
    ///
    /// Reading does not clear the record; consecutive reads with no
    /// intervening engine activity return equivalent records.
    ///
    /// # Panics
    ///
    /// Panics if called on an owned handle after [`close`](Loop::close).
    pub fn last_error(&self) -> Option<LoopError> {
        self.with_state_ref(|state| state.last_error())
    }

    /// Releases the underlying engine instance.
    ///
    /// For owned handles the first call releases the engine and invalidates
    /// everything registered against it; further calls are no-ops. For
    /// default handles this is always a no-op: the shared instance belongs
    /// to the thread, not to any one handle. Dropping a `Loop` performs the
    /// same release.
    pub fn close(&mut self) {
        match &mut self.inner {
            Inner::Owned(slot) => {
                if slot.take().is_some() {
                    debug!("closed owned event loop");
                }
            }
            Inner::Default => {}
        }
    }

    fn with_state<R>(&mut self, f: impl FnOnce(&mut LoopState) -> R) -> R {
        match &mut self.inner {
            Inner::Owned(slot) => f(slot.as_mut().expect("evloop: loop used after close")),
            Inner::Default => crate::default::with_default(f),
        }
    }

    fn with_state_ref<R>(&self, f: impl FnOnce(&LoopState) -> R) -> R {
        match &self.inner {
            Inner::Owned(slot) => f(slot.as_ref().expect("evloop: loop used after close")),
            Inner::Default => crate::default::with_default(|state| f(state)),
        }
    }
}

impl Drop for Loop {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fresh_state_has_zeroed_clock_and_no_error() {
        let state = LoopState::new().expect("engine init failed");
        assert_eq!(state.now(), 0);
        assert!(state.last_error().is_none());
    }

    #[test]
    fn refresh_advances_clock() {
        let mut state = LoopState::new().expect("engine init failed");
        thread::sleep(Duration::from_millis(5));
        state.update_time();
        assert!(state.now() >= 5);
    }

    #[test]
    fn clock_is_lazy_without_refresh() {
        let mut state = LoopState::new().expect("engine init failed");
        state.update_time();
        let before = state.now();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(state.now(), before);
    }
}

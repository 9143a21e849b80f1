//! Default loop integration tests
//!
//! The default instance is per-thread and each test runs on its own thread,
//! so every test below starts from a fresh shared instance.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use evloop::{Loop, run_default, run_once_default};
use evloop::calloop::timer::{TimeoutAction, Timer};

/// Arms a one-shot timer on `event_loop` that bumps `fired` when it expires.
fn arm_timer(event_loop: &Loop, delay: Duration, fired: &Rc<Cell<u32>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let fired = fired.clone();
    event_loop
        .handle()
        .insert_source(Timer::from_duration(delay), move |_, _, _| {
            fired.set(fired.get() + 1);
            TimeoutAction::Drop
        })
        .expect("failed to insert timer source");
}

/// Integration test: a timer armed through a default handle fires exactly
/// once when the free-function single iteration drives the shared instance.
#[test]
fn run_once_default_fires_timer_armed_through_handle() {
    let event_loop = Loop::default_loop();
    let fired = Rc::new(Cell::new(0));
    arm_timer(&event_loop, Duration::from_millis(10), &fired);

    assert!(run_once_default());
    assert_eq!(fired.get(), 1);
}

/// Integration test: every default handle observes one shared instance,
/// callbacks and clock included.
#[test]
fn default_handles_share_one_instance() {
    let first = Loop::default_loop();
    let mut second = Loop::default_loop();

    let fired = Rc::new(Cell::new(0));
    arm_timer(&first, Duration::from_millis(10), &fired);

    assert!(second.run_once());
    assert_eq!(fired.get(), 1);

    second.update_time();
    assert!(first.now() > 0);
    assert_eq!(first.now(), second.now());
}

/// Integration test: destroying one default handle leaves the shared
/// instance untouched for the others.
#[test]
fn dropping_one_default_handle_leaves_instance_usable() {
    let first = Loop::default_loop();
    let mut second = Loop::default_loop();
    drop(first);

    let fired = Rc::new(Cell::new(0));
    arm_timer(&second, Duration::from_millis(10), &fired);

    assert!(second.run_once());
    assert_eq!(fired.get(), 1);
}

/// Integration test: `run_default` matches `Loop::run` on a default handle,
/// returning success once a callback raises the stop signal.
#[test]
fn run_default_returns_after_stop_from_callback() {
    let event_loop = Loop::default_loop();
    let signal = event_loop.signal();
    let fired = Rc::new(Cell::new(0));

    let counter = fired.clone();
    event_loop
        .handle()
        .insert_source(
            Timer::from_duration(Duration::from_millis(10)),
            move |_, _, _| {
                counter.set(counter.get() + 1);
                signal.stop();
                TimeoutAction::Drop
            },
        )
        .expect("failed to insert timer source");

    assert!(run_default());
    assert_eq!(fired.get(), 1);
    assert!(event_loop.last_error().is_none());
}

/// Integration test: closing a default handle is a no-op, the free functions
/// keep driving the same instance afterwards.
#[test]
fn closing_default_handle_does_not_release_shared_instance() {
    let mut handle = Loop::default_loop();
    let fired = Rc::new(Cell::new(0));
    arm_timer(&handle, Duration::from_millis(10), &fired);

    handle.close();
    drop(handle);

    assert!(run_once_default());
    assert_eq!(fired.get(), 1);
}

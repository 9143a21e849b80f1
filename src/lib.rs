//! A thin ownership facade over a callback-based I/O event loop engine.
//!
//! This crate owns the lifetime of one engine instance per handle and exposes
//! a narrow control surface on top of it: run to completion, run a single
//! iteration, query the cached loop clock, and read back the last error the
//! engine recorded. All real work (polling, timer expiry and callback
//! dispatch) happens inside the engine ([`calloop`], re-exported here so
//! collaborators can name its source types). It consists of:
//!
//! - [`event_loop`]: the owning [`Loop`] handle and its control operations
//! - [`default`]: the thread-shared default instance and its free-function
//!   entry points
//! - [`error`]: opaque error records surfaced by the engine
//!
//! # Examples
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use evloop::Loop;
//! use evloop::calloop::timer::{TimeoutAction, Timer};
//!
//! let mut event_loop = Loop::new().expect("failed to create event loop");
//! let fired = Rc::new(Cell::new(false));
//!
//! let flag = fired.clone();
//! event_loop
//!     .handle()
//!     .insert_source(Timer::from_duration(Duration::from_millis(5)), move |_, _, _| {
//!         flag.set(true);
//!         TimeoutAction::Drop
//!     })
//!     .expect("failed to insert timer source");
//!
//! assert!(event_loop.run_once());
//! assert!(fired.get());
//! ```

pub mod default;
pub mod error;
pub mod event_loop;

pub use calloop;
pub use default::{run_default, run_once_default};
pub use error::LoopError;
pub use event_loop::Loop;

//! Opaque error records surfaced by the engine.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// An error record the engine associated with a loop instance.
///
/// The facade never interprets these; it captures whatever the engine
/// reported and hands it back through
/// [`Loop::last_error`](crate::Loop::last_error). Records are cheaply
/// cloneable and reading one does not clear it.
#[derive(Debug, Clone, Error)]
pub enum LoopError {
    /// A failure the engine reported through its own error type.
    #[error("event loop engine error: {0}")]
    Engine(Arc<calloop::Error>),
    /// A failure surfaced at the I/O layer of a loop iteration.
    #[error("event loop I/O error: {0}")]
    Io(Arc<io::Error>),
}

impl From<calloop::Error> for LoopError {
    fn from(err: calloop::Error) -> Self {
        LoopError::Engine(Arc::new(err))
    }
}

impl From<io::Error> for LoopError {
    fn from(err: io::Error) -> Self {
        LoopError::Io(Arc::new(err))
    }
}

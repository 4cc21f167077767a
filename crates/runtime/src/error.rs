//! Runtime errors.
//!
//! The core does not attempt recovery: every variant here is fatal for the
//! executing program. Errors propagate outward with `?` and the embedding
//! layer (CLI, test harness) decides how to report them.

use thiserror::Error;

/// Runtime result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the runtime core.
#[derive(Debug, Error)]
pub enum Error {
    /// An allocation still overflows the heap after a full collection.
    #[error("heap exhausted: requested {requested} bytes with {capacity} byte capacity")]
    HeapExhausted { requested: usize, capacity: usize },

    /// The call plan's frames do not fit in the stack segment.
    ///
    /// Detected at process construction, before any frame is entered.
    #[error("call plan requires {required} bytes of stack, capacity is {capacity}")]
    StackOverflow { required: usize, capacity: usize },

    /// The call plan names an operator with no registered native body.
    ///
    /// Indicates a corrupt or mismatched module description.
    #[error("unknown native operator: {0}")]
    UnknownNative(String),
}

//! Error type shared by every counting operation.

use thiserror::Error;

use crate::alloc::MemoryAim;
use crate::counter::State;

/// Errors raised by [`RainflowCounter`](crate::RainflowCounter).
///
/// The counter keeps a copy of the last error it raised, see
/// [`RainflowCounter::last_error`](crate::RainflowCounter::last_error).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A parameter was rejected, e.g. a class count above the maximum or an
    /// unknown residual method.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The allocator could not provide the residue or matrix storage.
    #[error("allocation failure: {len} elements for {aim:?}")]
    AllocationFailure { aim: MemoryAim, len: usize },

    /// The operation is not legal in the counter's current state.
    #[error("{operation} not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: State,
    },

    /// A confirmed turning point did not fit into the residue.
    #[error("residue overflow: capacity {capacity} exhausted")]
    ResidueOverflow { capacity: usize },
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether raising this error moves the counter into [`State::Error`].
    ///
    /// Only state violations leave the lifecycle untouched.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidState { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Errors reported by descriptor construction, kernels and scheduled operations.
///
/// Synchronous validation returns these directly. Failures inside a scheduling region are
/// recorded in the [`Sequence`](crate::Sequence) driving the region and observed after the join.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TileError {
    /// Illegal descriptor or driver parameters.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// The execution context could not be set up.
    #[error("context not initialized: {reason}")]
    NotInitialized { reason: String },

    /// The sequence already carries a failure, so the call performed no work.
    #[error("sequence already failed")]
    SequenceFailed,

    /// A kernel rejected one of its arguments. `index` is one-based.
    #[error("illegal value for kernel argument {index}")]
    KernelArgument { index: usize },

    /// A kernel detected a mathematically invalid input, such as a matrix that is not positive
    /// definite. `position` is one-based.
    #[error("numerical failure at position {position}")]
    NumericFailure { position: usize },

    /// A workspace allocation failed or its size overflowed.
    #[error("failed to allocate {bytes} bytes of workspace")]
    OutOfMemory { bytes: usize },
}

impl TileError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

impl From<dyn_stack::SizeOverflow> for TileError {
    #[inline]
    fn from(_: dyn_stack::SizeOverflow) -> Self {
        Self::OutOfMemory { bytes: usize::MAX }
    }
}

pub type Result<T> = std::result::Result<T, TileError>;

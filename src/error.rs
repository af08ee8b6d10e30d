use thiserror::Error;

/// Conditions that abort the current top-level evaluation.
///
/// Everything else (unbound symbols, car of an atom, calling a number) has an
/// inert fallback value and never surfaces here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LispError {
    /// The free list ran dry during allocation.
    #[error("*** OUT OF MEMORY ***")]
    OutOfMemory,

    /// The recursion-depth guard tripped before a closure call.
    #[error("*** STACK EXHAUSTED ***")]
    StackExhausted,

    /// The storage collaborator could not be opened, read or written.
    #[error("*** STORAGE UNAVAILABLE: {0} ***")]
    StorageUnavailable(String),
}

pub type LispResult<T> = Result<T, LispError>;

use std::fmt;
use thiserror::Error;

/// Boxed error produced by an error handler
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for pool runs
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Run-level errors. Any of these ends `start` without a `PoolOutput`.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Invalid concurrency: {0} (must be a number >= 1)")]
    InvalidConcurrency(usize),

    #[error("No item handler configured")]
    MissingHandler,

    #[error("Error handler failed: {0}")]
    ErrorHandlerFailed(#[source] BoxError),

    #[error("Pool is already running")]
    AlreadyRunning,

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExecutorError {
    /// Raised by validation before any item is processed
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConcurrency(_) | Self::MissingHandler)
    }
}

/// A failed item, paired with the error its handler returned.
///
/// Constructed only by the pool when an item fails and no error handler is
/// configured.
#[derive(Debug, Clone)]
pub struct PoolError<T, E> {
    item: T,
    index: usize,
    error: E,
}

impl<T, E> PoolError<T, E> {
    pub(crate) fn new(error: E, item: T, index: usize) -> Self {
        Self { item, index, error }
    }

    /// The item whose processing failed
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Position of the item in the input sequence
    pub fn index(&self) -> usize {
        self.index
    }

    /// The error returned by the handler
    pub fn error(&self) -> &E {
        &self.error
    }

    pub fn into_parts(self) -> (E, T, usize) {
        (self.error, self.item, self.index)
    }
}

impl<T, E: fmt::Display> fmt::Display for PoolError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item {} failed: {}", self.index, self.error)
    }
}

impl<T, E> std::error::Error for PoolError<T, E>
where
    T: fmt::Debug,
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

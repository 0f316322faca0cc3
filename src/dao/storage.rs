use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable description of the failure.
        message: String,
        /// Backend specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Optimistic updates kept losing against concurrent writers.
    #[error("{resource} is contended: gave up after {attempts} attempt(s)")]
    Contention {
        /// Resource whose versioned update kept failing.
        resource: String,
        /// Number of compare-and-swap attempts performed.
        attempts: u32,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

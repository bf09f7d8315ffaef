use std::sync::PoisonError;
use thiserror::Error;

/// Error type for repository operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// A unique field already holds this value
    #[error("Duplicate {field}: {value}")]
    Conflict {
        /// Name of the unique field
        field: &'static str,
        /// Value that collided
        value: String,
    },

    /// Lock error
    #[error("Lock error: {0}")]
    Lock(String),
}

impl<T> From<PoisonError<T>> for RepositoryError {
    fn from(error: PoisonError<T>) -> Self {
        RepositoryError::Lock(error.to_string())
    }
}

impl RepositoryError {
    /// Build a conflict error for a unique field
    pub fn conflict(field: &'static str, value: impl Into<String>) -> Self {
        RepositoryError::Conflict {
            field,
            value: value.into(),
        }
    }
}

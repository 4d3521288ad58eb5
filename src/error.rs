use thiserror::Error;

/// Errors reported by buffer, mesh and scene operations.
/// All of them are caller input validation failures; the failing call leaves
/// previously stored state untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl MeshError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        MeshError::InvalidArgument(message.into())
    }

    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        MeshError::InvalidOperation(message.into())
    }
}

pub type Result<T, E = MeshError> = std::result::Result<T, E>;

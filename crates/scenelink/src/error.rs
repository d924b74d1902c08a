//! Error taxonomy for the facade.

use scenelink_host::HostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{operation} failed for '{target}': {source}")]
    HostOperationFailed {
        operation: &'static str,
        target: String,
        #[source]
        source: HostError,
    },

    #[error("reference '{path}' no longer has a backing node in the scene")]
    StaleReference { path: String },

    #[error("{operation}: host returned an unexpected {found} value")]
    UnexpectedResult {
        operation: &'static str,
        found: &'static str,
    },
}

impl SceneError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        SceneError::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SceneError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;

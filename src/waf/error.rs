//! WAF control-plane error types

use thiserror::Error;

/// Remote operation an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reading a collection.
    Read,
    /// Creating a collection.
    Create,
    /// Replacing a collection's rule list.
    Update,
    /// Deleting a collection.
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors raised by the statement engine and the collection client.
#[derive(Debug, Error)]
pub enum WafError {
    /// Grammar violation or conflicting user input, raised before any remote call.
    #[error("validation failed at '{path}': {message}")]
    Validation {
        /// Location in the configuration tree.
        path: String,
        /// What was wrong.
        message: String,
    },

    /// Wire object that does not match the service schema.
    #[error("malformed wire object at '{path}': {message}")]
    MalformedWire {
        /// Location in the wire object.
        path: String,
        /// What was wrong.
        message: String,
    },

    /// Referenced collection does not exist remotely.
    #[error("{resource} not found during {operation}")]
    NotFound {
        /// Collection identifier.
        resource: String,
        /// Attempted operation.
        operation: Operation,
    },

    /// Lock token was stale.
    #[error("lock token for {resource} is stale during {operation}, re-read and retry")]
    Conflict {
        /// Collection identifier.
        resource: String,
        /// Attempted operation.
        operation: Operation,
    },

    /// Remote side temporarily unable to serve the request.
    #[error("transient failure on {resource} during {operation}: {message}")]
    TransientService {
        /// Collection identifier.
        resource: String,
        /// Attempted operation.
        operation: Operation,
        /// Service message.
        message: String,
    },

    /// Delete blocked by another object still referencing this one.
    #[error("{resource} is still referenced, {operation} blocked: {message}")]
    AssociatedItem {
        /// Collection identifier.
        resource: String,
        /// Attempted operation.
        operation: Operation,
        /// Service message.
        message: String,
    },

    /// Persisted state could not be encoded or decoded.
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for WAF operations
pub type WafResult<T> = Result<T, WafError>;

impl WafError {
    /// Create a validation error.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-wire error.
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedWire {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if the surrounding layer may retry the call unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientService { .. } | Self::AssociatedItem { .. }
        )
    }

    /// Check if the error means the collection is gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if the error is a lock-token mismatch
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Get the remote resource identifier, if the error came from a remote call
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::NotFound { resource, .. }
            | Self::Conflict { resource, .. }
            | Self::TransientService { resource, .. }
            | Self::AssociatedItem { resource, .. } => Some(resource),
            _ => None,
        }
    }
}

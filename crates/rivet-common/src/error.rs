//! Unified error types for the Rivet workspace.
//!
//! Registration mistakes surface as [`RivetError::Configuration`] at the call
//! that made them; everything else is raised while a service is resolved.

use thiserror::Error;

/// Boxed error raised by user-supplied factory or hook code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum RivetError {
    /// A registration or definition-building call was malformed.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Description of the invalid call.
        message: String,
    },

    /// A required reference resolved to nothing.
    #[error("<{key}> not found.")]
    ReferenceNotFound {
        /// Service id the reference pointed at.
        key: String,
    },

    /// A configurator action could not be dispatched on its target.
    #[error("invalid callable <{action}>")]
    InvalidCallable {
        /// Method name that the target does not expose.
        action: String,
    },

    /// A service was requested again while it was still being constructed.
    #[error("cyclic dependency detected: {}", .chain.join(" -> "))]
    CyclicDependency {
        /// Resolution chain, ending with the id that closed the cycle.
        chain: Vec<String>,
    },

    /// A typed access found a value of another type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type the caller asked for.
        expected: &'static str,
        /// Type actually stored.
        found: &'static str,
    },

    /// A resolved argument was missing or had the wrong shape.
    #[error("argument {position}: {message}")]
    Argument {
        /// Zero-based position in the argument list.
        position: usize,
        /// Description of the problem.
        message: String,
    },

    /// User factory or hook code failed.
    #[error("service <{id}> failed: {source}")]
    Service {
        /// Service id being constructed, if known.
        id: String,
        /// Underlying error.
        source: BoxError,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl RivetError {
    /// Builds a [`RivetError::Configuration`] from any message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wraps an error raised by user code while building `id`.
    pub fn service(id: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Service {
            id: id.into(),
            source: source.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RivetError>;

//! Unified error types for the inventory core.
//!
//! Every variant renders a human-readable message, since that string is all the
//! presentation layer receives when an operation fails.

use thiserror::Error;

/// All failures surfaced by the stores, the resolver and the persistence layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or malformed. Raised before any persistence attempt.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A mutation was attempted without a current user identity.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A location display name matched neither a storage location nor a container-item.
    #[error("Selected location not found: {name}")]
    UnresolvedLocation {
        /// The display name that could not be resolved
        name: String,
    },

    /// The persistence collaborator rejected a call. The underlying message is preserved.
    #[error("Remote operation failed: {message}")]
    RemoteOperationFailed {
        /// Message reported by the backend
        message: String,
    },

    /// A parent chain revisited a location, or an update would introduce such a chain.
    #[error("Cycle detected in location hierarchy at {id}")]
    CycleDetected {
        /// The location id where the cycle was observed
        id: String,
    },

    /// A value total no longer fits in a decimal.
    #[error("Total value is too large to represent")]
    ValueOverflow,

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Details about the configuration failure
        message: String,
    },

    /// The local mirror could not be read or written.
    #[error("Cache error: {message}")]
    Cache {
        /// Details about the cache failure
        message: String,
    },
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::RemoteOperationFailed {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Cache {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Cache {
            message: err.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for include resolution and aggregate query execution.

use thiserror::Error;

/// Result type for include operations.
pub type IncludeResult<T> = Result<T, IncludeError>;

/// Errors that can occur while composing or executing an aggregate query.
///
/// Everything except [`IncludeError::Driver`], [`IncludeError::BsonDe`] and
/// [`IncludeError::Cancelled`] is raised synchronously while the query is being
/// composed. None of them is retried.
#[derive(Error, Debug)]
pub enum IncludeError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// BSON deserialization error.
    #[error("bson deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),

    /// A required argument was missing or empty.
    #[error("argument '{param}' is required: {message}")]
    Argument {
        /// Name of the offending parameter.
        param: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The requested shape is not supported (filtered includes, foreign queryables).
    #[error("not supported: {0}")]
    Unsupported(String),

    /// The navigation member is not a field/property or not an entity type.
    #[error("invalid member: {0}")]
    InvalidMember(String),

    /// No unambiguous member carries the foreign key of a navigation.
    #[error("foreign key mismatch: {0}")]
    ForeignKeyMismatch(String),

    /// The operation exists but has no implementation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The driver plan text could not be turned back into pipeline stages.
    #[error("stage extraction failed: {0}")]
    Extraction(String),

    /// The sequence contained no elements.
    #[error("sequence contains no elements")]
    NoElements,

    /// The sequence contained more than one element.
    #[error("sequence contains more than one element")]
    MoreThanOneElement,

    /// The operation was cancelled before it completed.
    #[error("operation was cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IncludeError {
    /// Create an argument error for the given parameter.
    pub fn argument(param: &'static str, message: impl Into<String>) -> Self {
        Self::Argument {
            param,
            message: message.into(),
        }
    }

    /// Create a not supported error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create an invalid member error.
    pub fn invalid_member(message: impl Into<String>) -> Self {
        Self::InvalidMember(message.into())
    }

    /// Create a foreign key mismatch error.
    pub fn foreign_key_mismatch(message: impl Into<String>) -> Self {
        Self::ForeignKeyMismatch(message.into())
    }

    /// Create a not implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    /// Create a stage extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a foreign key mismatch.
    pub fn is_foreign_key_mismatch(&self) -> bool {
        matches!(self, Self::ForeignKeyMismatch(_))
    }

    /// Check if this is a not supported error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Check if this is an invalid member error.
    pub fn is_invalid_member(&self) -> bool {
        matches!(self, Self::InvalidMember(_))
    }

    /// Check if this is a not implemented error.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }

    /// Check if the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

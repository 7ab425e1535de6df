//! Error types for NetMesh

use thiserror::Error;

/// Result type alias using NetMesh Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification exposed to front ends.
///
/// Every [`Error`] maps onto exactly one kind; transports translate kinds into
/// their own status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidCredential,
    Forbidden,
    Conflict,
    Validation,
    Upstream,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidCredential => write!(f, "invalid_credential"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Upstream => write!(f, "upstream"),
        }
    }
}

/// NetMesh error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} {id} does not exist")]
    NotFound { kind: String, id: String },

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Wrap a collaborator failure with the operation that issued the call.
    ///
    /// Taxonomy errors raised deliberately by the collaborator (a store
    /// reporting `NotFound`, a validation rejection) pass through untouched.
    pub fn upstream(context: impl Into<String>, source: Error) -> Self {
        match source {
            Error::NotFound { .. }
            | Error::InvalidCredential(_)
            | Error::Forbidden(_)
            | Error::Conflict(_)
            | Error::Validation(_) => source,
            other => Error::Upstream {
                context: context.into(),
                source: Box::new(other),
            },
        }
    }

    /// Classify this error for front ends.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidCredential(_) => ErrorKind::InvalidCredential,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Validation(_) | Error::InvalidConfig(_) => ErrorKind::Validation,
            Error::Upstream { .. }
            | Error::Io(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Timeout { .. }
            | Error::Internal(_) => ErrorKind::Upstream,
        }
    }
}

//! Error types for graph operations.
//!
//! `GraphError` is what the store adapter and the statement builders produce.
//! Repositories never hand it out directly: every failure is logged at the
//! component boundary and re-raised as a uniform [`OperationError`].

use std::fmt;

use thiserror::Error;

/// Errors from graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Neo4j unavailable: {0}")]
    Unavailable(String),

    #[error("Neo4j query error: {0}")]
    Query(String),

    #[error("Neo4j constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("{label} not found: {id}")]
    NotFound { label: &'static str, id: String },

    #[error("{label} already exists: {id}")]
    Conflict { label: &'static str, id: String },

    #[error("Ambiguous match: {count} {label} entries for {id}")]
    Ambiguous {
        label: &'static str,
        id: String,
        count: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GraphError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::StoreUnavailable,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } | Self::ConstraintViolation(_) => ErrorKind::Conflict,
            Self::Ambiguous { .. } => ErrorKind::AmbiguousMatch,
            Self::Query(_) | Self::Serialization(_) => ErrorKind::Query,
        }
    }
}

/// Neo4j status code raised when a write breaks a uniqueness constraint.
const CONSTRAINT_VALIDATION_FAILED: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

impl From<neo4rs::Error> for GraphError {
    fn from(err: neo4rs::Error) -> Self {
        match &err {
            neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
                Self::Unavailable(err.to_string())
            }
            neo4rs::Error::Neo4j(server) => Self::from_server(
                server.code(),
                matches!(server.kind(), neo4rs::Neo4jErrorKind::Transient),
                err.to_string(),
            ),
            _ => Self::Query(err.to_string()),
        }
    }
}

impl GraphError {
    /// Classify a failure reported by the server from its status code.
    ///
    /// The message is carried along verbatim and never inspected; it may
    /// quote user data such as the conflicting id.
    fn from_server(code: &str, transient: bool, message: String) -> Self {
        if code == CONSTRAINT_VALIDATION_FAILED {
            Self::ConstraintViolation(message)
        } else if transient {
            Self::Unavailable(message)
        } else {
            Self::Query(message)
        }
    }
}

/// Coarse failure category reported to callers of the data-access layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Zero matches where exactly one was required.
    NotFound,
    /// Identity or edge uniqueness violated on create.
    Conflict,
    /// More than one match where exactly one was expected.
    AmbiguousMatch,
    /// Connectivity or timeout talking to the store.
    StoreUnavailable,
    /// Any other engine or decoding failure.
    Query,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::AmbiguousMatch => "ambiguous match",
            Self::StoreUnavailable => "store unavailable",
            Self::Query => "query failure",
        };
        f.write_str(name)
    }
}

/// The single failure signal returned by repositories and the resolver.
#[derive(Debug, Error)]
#[error("{operation} failed ({kind})")]
pub struct OperationError {
    pub operation: &'static str,
    pub kind: ErrorKind,
    #[source]
    pub source: GraphError,
}

impl OperationError {
    /// Log `source` with its context and wrap it.
    pub(crate) fn logged(
        operation: &'static str,
        label: &'static str,
        ids: &[&str],
        source: GraphError,
    ) -> Self {
        let kind = source.kind();
        tracing::error!(operation, label, ids = ?ids, ?kind, error = %source, "Graph operation failed");
        Self {
            operation,
            kind,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, OperationError>;

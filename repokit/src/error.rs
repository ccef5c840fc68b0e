//! Error types for the data-access layer

use std::fmt;
use thiserror::Error;

use crate::filter::FilterError;
use crate::repository::RepositoryError;

// ============================================================================
// Structured Storage Errors
// ============================================================================

/// Storage operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    /// Running a query plan against an entity set
    Fetch,
    /// Looking up a single entity by key
    Find,
    /// Running a registered named query
    NamedQuery,
    /// Committing staged changes
    Commit,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Find => write!(f, "find"),
            Self::NamedQuery => write!(f, "named_query"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// Category of storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// A lookup key does not match the kind of the entity's key field
    InvalidKey,
    /// An entity with the same key is already stored
    AlreadyExists,
    /// A staged change expected to affect a row but affected none
    Concurrency,
    /// No named query is registered under the requested name
    UnknownQuery,
    /// No eager-load hook is registered for the requested relation
    UnknownInclude,
    /// Other/unknown error
    Other,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid_key"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::Concurrency => write!(f, "concurrency"),
            Self::UnknownQuery => write!(f, "unknown_query"),
            Self::UnknownInclude => write!(f, "unknown_include"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured storage error with operation context
///
/// Raised by a [`DataContext`](crate::context::DataContext) and passed through
/// the repository unchanged apart from the conversion into
/// [`RepositoryError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    /// The operation being performed when the error occurred
    pub operation: StorageOperation,
    /// The category of error
    pub kind: StorageErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional context (e.g., entity set name, key)
    pub context: Option<String>,
}

impl StorageError {
    /// Create a new storage error
    pub fn new(
        operation: StorageOperation,
        kind: StorageErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Create an "already exists" error raised while committing
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(
            StorageOperation::Commit,
            StorageErrorKind::AlreadyExists,
            message,
        )
    }

    /// Create a concurrency error raised while committing
    pub fn concurrency(message: impl Into<String>) -> Self {
        Self::new(
            StorageOperation::Commit,
            StorageErrorKind::Concurrency,
            message,
        )
    }

    /// Create an invalid key error raised by a lookup
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::new(StorageOperation::Find, StorageErrorKind::InvalidKey, message)
    }

    /// Create an unknown named query error
    pub fn unknown_query(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            StorageOperation::NamedQuery,
            StorageErrorKind::UnknownQuery,
            format!("No named query registered as `{}`", name),
        )
    }

    /// Create an unknown include error
    pub fn unknown_include(relation: impl Into<String>) -> Self {
        let relation = relation.into();
        Self::new(
            StorageOperation::Fetch,
            StorageErrorKind::UnknownInclude,
            format!("No eager-load hook registered for `{}`", relation),
        )
    }

    /// Add context to an existing error
    #[must_use]
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Storage {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref ctx) = self.context {
            write!(f, " [context: {}]", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Filter translation error
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Structured storage error with operation context
    #[error("{0}")]
    Storage(StorageError),

    /// Structured repository error
    #[error("{0}")]
    Repository(RepositoryError),

    /// Tracing subscriber could not be installed
    #[error("Tracing error: {0}")]
    Tracing(String),
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        Error::Repository(err)
    }
}

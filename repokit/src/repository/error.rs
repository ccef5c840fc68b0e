//! Repository error types
//!
//! Storage and filter failures are converted into a [`RepositoryError`] at the
//! repository boundary, tagged with the repository operation and entity.
//!
//! # Example
//!
//! ```rust
//! use repokit::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
//!
//! let error = RepositoryError::new(
//!     RepositoryOperation::Insert,
//!     RepositoryErrorKind::AlreadyExists,
//!     "Entity already exists",
//! )
//! .with_entity("Country", "France");
//! assert_eq!(
//!     error.to_string(),
//!     "Repository already_exists error during insert: Entity already exists [Country: France]"
//! );
//! ```

use std::fmt;

use crate::error::{StorageError, StorageErrorKind};
use crate::filter::FilterError;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Removing a given entity
    Delete,
    /// Removing an entity looked up by key
    DeleteById,
    /// Listing every entity
    GetAll,
    /// Looking up one entity by key
    GetById,
    /// Running a structured filter
    Get,
    /// Running a serialized-expression filter
    GetByExpression,
    /// Adding a new entity
    Insert,
    /// Replacing an existing entity
    Update,
    /// Building the repository
    Construct,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::DeleteById => write!(f, "delete_by_id"),
            Self::GetAll => write!(f, "get_all"),
            Self::GetById => write!(f, "get_by_id"),
            Self::Get => write!(f, "get"),
            Self::GetByExpression => write!(f, "get_by_expression"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Construct => write!(f, "construct"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// A lookup key does not match the kind of the entity's key field
    InvalidKey,
    /// Entity already exists (duplicate key)
    AlreadyExists,
    /// A change affected no stored row
    Concurrency,
    /// The filter could not be translated
    InvalidFilter,
    /// A named query is not registered with the context
    UnknownQuery,
    /// Underlying storage error
    StorageError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid_key"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::Concurrency => write!(f, "concurrency"),
            Self::InvalidFilter => write!(f, "invalid_filter"),
            Self::UnknownQuery => write!(f, "unknown_query"),
            Self::StorageError => write!(f, "storage_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
///
/// Provides detailed information about what operation failed, why it failed,
/// and which entity was involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Country")
    pub entity_type: Option<String>,
    /// The key of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create an unknown named query error raised while building a repository
    pub fn unknown_query(entity_type: impl Into<String>, query: &str) -> Self {
        Self {
            operation: RepositoryOperation::Construct,
            kind: RepositoryErrorKind::UnknownQuery,
            message: format!("Get-all query `{}` is not registered", query),
            entity_type: Some(entity_type.into()),
            entity_id: None,
        }
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Add the entity type without a key
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    pub fn is_invalid_filter(&self) -> bool {
        self.kind == RepositoryErrorKind::InvalidFilter
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

// Conversions default the operation; callers tag it with `with_operation`

impl From<StorageError> for RepositoryError {
    fn from(err: StorageError) -> Self {
        let kind = match err.kind {
            StorageErrorKind::InvalidKey => RepositoryErrorKind::InvalidKey,
            StorageErrorKind::AlreadyExists => RepositoryErrorKind::AlreadyExists,
            StorageErrorKind::Concurrency => RepositoryErrorKind::Concurrency,
            StorageErrorKind::UnknownQuery => RepositoryErrorKind::UnknownQuery,
            StorageErrorKind::UnknownInclude | StorageErrorKind::Other => {
                RepositoryErrorKind::StorageError
            }
        };
        Self::new(RepositoryOperation::Get, kind, err.to_string())
    }
}

impl From<FilterError> for RepositoryError {
    fn from(err: FilterError) -> Self {
        Self::new(
            RepositoryOperation::Get,
            RepositoryErrorKind::InvalidFilter,
            err.to_string(),
        )
    }
}

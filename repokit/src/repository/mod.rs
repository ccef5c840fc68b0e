//! Generic repository over a persistence context
//!
//! # Features
//!
//! - **Generic CRUD**: [`Repository`] trait for delete, get, insert and update
//! - **Filtering**: [`get`](Repository::get) takes a structured
//!   [`QueryFilter`](crate::filter::QueryFilter),
//!   [`get_by_expression`](Repository::get_by_expression) a serialized
//!   [`ExpressionFilter`](crate::expression::ExpressionFilter)
//! - **Context-backed**: [`ContextRepository`] delegates every operation to a
//!   [`DataContext`](crate::context::DataContext) and commits immediately
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::context::MemoryStore;
//! use repokit::repository::{ContextRepository, Repository};
//!
//! let store = MemoryStore::builder().seed(countries).build();
//! let mut repo = ContextRepository::<Country, _>::new(store.context())?;
//!
//! if let Some(france) = repo.get_by_id("France").await? {
//!     repo.delete(france).await?;
//! }
//! ```

mod context_repository;
mod error;
mod traits;

// Re-export all public types
pub use context_repository::ContextRepository;
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use traits::{Repository, RepositoryResult};

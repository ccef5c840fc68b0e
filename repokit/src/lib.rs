//! # repokit
//!
//! Generic repository and dynamic filter layer over a pluggable persistence context.
//!
//! ## Features
//!
//! - **Repository**: one CRUD façade for every entity type, committing on each mutation
//! - **Structured filters**: ANDed field descriptors with include paths and ordering
//! - **Expression filters**: versioned JSON boolean trees that survive a wire round trip
//! - **Persistence contexts**: unit-of-work trait with an in-memory implementation
//! - **Configuration**: figment layering of defaults, TOML files and environment
//!
//! ## Example
//!
//! ```rust,ignore
//! use repokit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let store = MemoryStore::builder().seed(countries()).build();
//!     let repo = ContextRepository::<Country, _>::from_config(store.context(), &config)?;
//!
//!     let filter = ExpressionFilter::new(&Expr::or(vec![
//!         Expr::field("population").gt(50_000_000),
//!         Expr::field("capital").is_null(),
//!     ]))?
//!     .order_by("name", false);
//!
//!     for country in repo.get_by_expression(&filter).await? {
//!         info!(name = %country.name, "matched");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod expression;
pub mod filter;
pub mod observability;
pub mod repository;
pub mod schema;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, ServiceConfig};
    pub use crate::error::{Error, Result, StorageError, StorageErrorKind, StorageOperation};

    pub use crate::schema::{Entity, FieldKind, FieldValue, Schema};

    pub use crate::filter::{
        CaseSensitivity, FilterError, FilterOperator, FilterOptions, FilterProperty,
        OrderDirection, QueryFilter, QueryPlan,
    };

    pub use crate::expression::{Expr, ExpressionFilter};

    pub use crate::context::{DataContext, MemoryContext, MemoryStore};

    pub use crate::repository::{
        ContextRepository, Repository, RepositoryError, RepositoryErrorKind, RepositoryOperation,
        RepositoryResult,
    };

    pub use crate::observability::{init_tracing, shutdown_tracing};

    // Re-export tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

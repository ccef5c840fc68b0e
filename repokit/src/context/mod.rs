//! Persistence contexts
//!
//! A [`DataContext`] stores entity sets, runs query plans against them and
//! stages changes until [`DataContext::save_changes`] commits them. The
//! repository layer only talks to storage through this trait.
//!
//! [`MemoryStore`] is the in-memory implementation: a shared store hands out
//! request-scoped [`MemoryContext`]s that stage changes privately and commit
//! them atomically.

mod memory;

pub use memory::{EntitySets, MemoryContext, MemoryStore, MemoryStoreBuilder};

use std::future::Future;

use crate::error::StorageError;
use crate::filter::QueryPlan;
use crate::schema::{Entity, FieldValue};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Unit of work over one or more entity sets
///
/// Reads never track the entities they return. Changes staged with
/// [`add`](Self::add), [`remove`](Self::remove) and
/// [`mark_modified`](Self::mark_modified) are invisible until
/// [`save_changes`](Self::save_changes) commits them. A commit applies all
/// staged changes or none, and clears the staged list either way.
pub trait DataContext: Send + Sync {
    /// Run a query plan: filter, eager-load the plan's includes, then order
    fn fetch<E: Entity>(
        &self,
        plan: &QueryPlan<E>,
    ) -> impl Future<Output = StorageResult<Vec<E>>> + Send;

    /// Look up one entity by key
    fn find<E: Entity>(
        &self,
        key: &FieldValue,
    ) -> impl Future<Output = StorageResult<Option<E>>> + Send;

    /// Whether a named query producing `E` is registered under `name`
    fn has_named_query<E: Entity>(&self, name: &str) -> bool;

    /// Run a registered named query producing `E`
    fn run_named_query<E: Entity>(
        &self,
        name: &str,
    ) -> impl Future<Output = StorageResult<Vec<E>>> + Send;

    /// Stage an insert
    fn add<E: Entity>(&mut self, entity: E);

    /// Stage the removal of the stored entity with the same key
    fn remove<E: Entity>(&mut self, entity: &E);

    /// Stage a full replacement of the stored entity with the same key
    fn mark_modified<E: Entity>(&mut self, entity: E);

    /// Number of staged changes
    fn pending_changes(&self) -> usize;

    /// Commit staged changes, returning the number of affected rows
    fn save_changes(&mut self) -> impl Future<Output = StorageResult<usize>> + Send;
}

//! Repository trait definition
//!
//! The trait uses RPITIT (Return Position Impl Trait In Traits), so
//! implementations can write plain `async fn` without `async_trait`.

use std::future::Future;

use super::error::RepositoryError;
use crate::expression::ExpressionFilter;
use crate::filter::QueryFilter;
use crate::schema::{Entity, FieldValue};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// CRUD façade over one entity type
///
/// Every mutating operation commits immediately; no transaction spans two
/// calls. Reads return detached copies. "Not found" is reported as `false`
/// or `None`, never as an error.
///
/// # Example
///
/// ```rust,ignore
/// use repokit::prelude::*;
///
/// let mut repo = ContextRepository::<Country, _>::new(store.context())?;
///
/// repo.insert(Country::new("Norway", 5_500_000, 385_207.0)).await?;
///
/// let filter = QueryFilter::new()
///     .with_property(FilterProperty::gt("population", 5_000_000))
///     .order_by("name", false);
/// let big = repo.get(&filter).await?;
///
/// assert!(repo.delete_by_id("Norway").await?);
/// assert!(!repo.delete_by_id("Norway").await?);
/// ```
pub trait Repository<E: Entity>: Send + Sync {
    /// Remove an entity and commit
    ///
    /// Returns `true` when at least one stored row was affected.
    fn delete(&mut self, entity: E) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Remove the entity with the given key, if stored
    ///
    /// Returns `false` without error when no entity has the key.
    fn delete_by_id(
        &mut self,
        id: impl Into<FieldValue> + Send,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Every stored entity, or the result of the entity's get-all query
    fn get_all(&self) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Find an entity by key
    ///
    /// Returns `Ok(Some(entity))` if found, `Ok(None)` if not found.
    fn get_by_id(
        &self,
        id: impl Into<FieldValue> + Send,
    ) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;

    /// Entities matching a structured filter
    fn get(&self, filter: &QueryFilter<E>)
        -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Entities matching a serialized-expression filter
    fn get_by_expression(
        &self,
        filter: &ExpressionFilter<E>,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Add an entity and commit, returning it
    fn insert(&mut self, entity: E) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;

    /// Replace the stored entity with the same key and commit, returning it
    fn update(&mut self, entity: E) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{RepositoryErrorKind, RepositoryOperation};
    use crate::testing::Country;

    #[test]
    fn test_repository_result_type() {
        let ok_result: RepositoryResult<i32> = Ok(42);
        assert!(ok_result.is_ok());

        let err_result: RepositoryResult<i32> = Err(RepositoryError::new(
            RepositoryOperation::Get,
            RepositoryErrorKind::Other,
            "failed",
        ));
        assert!(err_result.is_err());
    }

    // Verifies the trait can be implemented without a persistence context
    struct NullRepository;

    impl Repository<Country> for NullRepository {
        async fn delete(&mut self, _entity: Country) -> RepositoryResult<bool> {
            Ok(false)
        }

        async fn delete_by_id(&mut self, _id: impl Into<FieldValue> + Send) -> RepositoryResult<bool> {
            Ok(false)
        }

        async fn get_all(&self) -> RepositoryResult<Vec<Country>> {
            Ok(vec![])
        }

        async fn get_by_id(&self, _id: impl Into<FieldValue> + Send) -> RepositoryResult<Option<Country>> {
            Ok(None)
        }

        async fn get(&self, _filter: &QueryFilter<Country>) -> RepositoryResult<Vec<Country>> {
            Ok(vec![])
        }

        async fn get_by_expression(
            &self,
            _filter: &ExpressionFilter<Country>,
        ) -> RepositoryResult<Vec<Country>> {
            Ok(vec![])
        }

        async fn insert(&mut self, entity: Country) -> RepositoryResult<Option<Country>> {
            Ok(Some(entity))
        }

        async fn update(&mut self, entity: Country) -> RepositoryResult<Option<Country>> {
            Ok(Some(entity))
        }
    }

    #[tokio::test]
    async fn test_trait_is_implementable() {
        let mut repo = NullRepository;
        assert!(!repo.delete_by_id("France").await.unwrap());
        assert!(repo.get_by_id(1).await.unwrap().is_none());
        let fiji = Country::new("Fiji", 900_000, 18_274.0);
        assert_eq!(repo.insert(fiji.clone()).await.unwrap(), Some(fiji));
    }
}

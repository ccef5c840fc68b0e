//! Repository backed by a persistence context

use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, info};

use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::traits::{Repository, RepositoryResult};
use crate::config::Config;
use crate::context::DataContext;
use crate::error::StorageError;
use crate::expression::ExpressionFilter;
use crate::filter::{FilterError, FilterOptions, QueryFilter, QueryPlan};
use crate::schema::{Entity, FieldValue};

/// [`Repository`] implementation delegating to a [`DataContext`]
///
/// Owns its context for the lifetime of a request. Filters are compiled with
/// the repository's [`FilterOptions`] before the context is touched, so an
/// invalid filter never reaches storage.
///
/// If the entity's schema names a get-all query, the query must be
/// registered with the context when the repository is built; `get_all`
/// then runs it instead of a full scan.
pub struct ContextRepository<E: Entity, C: DataContext> {
    context: C,
    options: FilterOptions,
    get_all_query: Option<&'static str>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, C: DataContext> ContextRepository<E, C> {
    /// Build a repository with default filter options
    pub fn new(context: C) -> RepositoryResult<Self> {
        Self::with_options(context, FilterOptions::default())
    }

    /// Build a repository using the `filter` section of the configuration
    pub fn from_config(context: C, config: &Config) -> RepositoryResult<Self> {
        Self::with_options(context, config.filter.clone())
    }

    pub fn with_options(context: C, options: FilterOptions) -> RepositoryResult<Self> {
        let schema = E::schema();
        let get_all_query = schema.get_all_query();

        if let Some(query) = get_all_query {
            if !context.has_named_query::<E>(query) {
                return Err(RepositoryError::unknown_query(schema.entity_name(), query));
            }
            debug!(
                entity = schema.entity_name(),
                query, "Resolved get-all query"
            );
        }

        Ok(Self {
            context,
            options,
            get_all_query,
            _entity: PhantomData,
        })
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Give the context back, e.g. to hand it to another repository
    pub fn into_context(self) -> C {
        self.context
    }

    async fn commit(
        &mut self,
        operation: RepositoryOperation,
        key: &FieldValue,
    ) -> RepositoryResult<usize> {
        let affected = self
            .context
            .save_changes()
            .await
            .map_err(|e| keyed_error::<E>(e.into(), operation, key))?;
        info!(
            entity = E::schema().entity_name(),
            key = %key,
            operation = %operation,
            rows = affected,
            "Committed"
        );
        Ok(affected)
    }

    async fn fetch(
        &self,
        plan: QueryPlan<E>,
        operation: RepositoryOperation,
    ) -> RepositoryResult<Vec<E>> {
        let rows = self
            .context
            .fetch(&plan)
            .await
            .map_err(|e| storage_error::<E>(e, operation))?;
        debug!(
            entity = E::schema().entity_name(),
            operation = %operation,
            rows = rows.len(),
            "Query returned"
        );
        Ok(rows)
    }
}

fn storage_error<E: Entity>(err: StorageError, operation: RepositoryOperation) -> RepositoryError {
    RepositoryError::from(err)
        .with_operation(operation)
        .with_entity_type(E::schema().entity_name())
}

fn filter_error<E: Entity>(err: FilterError, operation: RepositoryOperation) -> RepositoryError {
    RepositoryError::from(err)
        .with_operation(operation)
        .with_entity_type(E::schema().entity_name())
}

fn keyed_error<E: Entity>(
    err: RepositoryError,
    operation: RepositoryOperation,
    key: &FieldValue,
) -> RepositoryError {
    err.with_operation(operation)
        .with_entity(E::schema().entity_name(), key.to_string())
}

fn check_key<E: Entity>(key: &FieldValue, operation: RepositoryOperation) -> RepositoryResult<()> {
    let schema = E::schema();
    match schema.key_mismatch(key) {
        None => Ok(()),
        Some(message) => Err(
            RepositoryError::new(operation, RepositoryErrorKind::InvalidKey, message)
                .with_entity(schema.entity_name(), key.to_string()),
        ),
    }
}

impl<E: Entity, C: DataContext> Repository<E> for ContextRepository<E, C> {
    #[tracing::instrument(skip_all, fields(entity = E::schema().entity_name()))]
    async fn delete(&mut self, entity: E) -> RepositoryResult<bool> {
        let key = E::schema().key(&entity);
        self.context.remove(&entity);
        let affected = self.commit(RepositoryOperation::Delete, &key).await?;
        Ok(affected > 0)
    }

    #[tracing::instrument(skip_all, fields(entity = E::schema().entity_name()))]
    async fn delete_by_id(&mut self, id: impl Into<FieldValue> + Send) -> RepositoryResult<bool> {
        let key = id.into();
        check_key::<E>(&key, RepositoryOperation::DeleteById)?;
        let found = self
            .context
            .find::<E>(&key)
            .await
            .map_err(|e| keyed_error::<E>(e.into(), RepositoryOperation::DeleteById, &key))?;

        let Some(entity) = found else {
            debug!(key = %key, "Nothing to delete");
            return Ok(false);
        };

        self.context.remove(&entity);
        let affected = self.commit(RepositoryOperation::DeleteById, &key).await?;
        Ok(affected > 0)
    }

    #[tracing::instrument(skip_all, fields(entity = E::schema().entity_name()))]
    async fn get_all(&self) -> RepositoryResult<Vec<E>> {
        match self.get_all_query {
            Some(query) => {
                let rows = self
                    .context
                    .run_named_query::<E>(query)
                    .await
                    .map_err(|e| storage_error::<E>(e, RepositoryOperation::GetAll))?;
                debug!(query, rows = rows.len(), "Get-all query returned");
                Ok(rows)
            }
            None => self.fetch(QueryPlan::all(), RepositoryOperation::GetAll).await,
        }
    }

    #[tracing::instrument(skip_all, fields(entity = E::schema().entity_name()))]
    async fn get_by_id(&self, id: impl Into<FieldValue> + Send) -> RepositoryResult<Option<E>> {
        let key = id.into();
        check_key::<E>(&key, RepositoryOperation::GetById)?;
        self.context
            .find::<E>(&key)
            .await
            .map_err(|e| keyed_error::<E>(e.into(), RepositoryOperation::GetById, &key))
    }

    #[tracing::instrument(skip_all, fields(entity = E::schema().entity_name()))]
    async fn get(&self, filter: &QueryFilter<E>) -> RepositoryResult<Vec<E>> {
        let plan = filter
            .compile(&self.options)
            .map_err(|e| filter_error::<E>(e, RepositoryOperation::Get))?;
        self.fetch(plan, RepositoryOperation::Get).await
    }

    #[tracing::instrument(skip_all, fields(entity = E::schema().entity_name()))]
    async fn get_by_expression(&self, filter: &ExpressionFilter<E>) -> RepositoryResult<Vec<E>> {
        let plan = filter
            .compile(&self.options)
            .map_err(|e| filter_error::<E>(e, RepositoryOperation::GetByExpression))?;
        self.fetch(plan, RepositoryOperation::GetByExpression).await
    }

    #[tracing::instrument(skip_all, fields(entity = E::schema().entity_name()))]
    async fn insert(&mut self, entity: E) -> RepositoryResult<Option<E>> {
        let key = E::schema().key(&entity);
        self.context.add(entity.clone());
        let affected = self.commit(RepositoryOperation::Insert, &key).await?;
        Ok((affected > 0).then_some(entity))
    }

    #[tracing::instrument(skip_all, fields(entity = E::schema().entity_name()))]
    async fn update(&mut self, entity: E) -> RepositoryResult<Option<E>> {
        let key = E::schema().key(&entity);
        self.context.mark_modified(entity.clone());
        let affected = self.commit(RepositoryOperation::Update, &key).await?;
        Ok((affected > 0).then_some(entity))
    }
}

impl<E: Entity, C: DataContext + fmt::Debug> fmt::Debug for ContextRepository<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRepository")
            .field("entity", &E::schema().entity_name())
            .field("context", &self.context)
            .field("options", &self.options)
            .field("get_all_query", &self.get_all_query)
            .finish()
    }
}

//! In-memory persistence context

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{DataContext, StorageResult};
use crate::error::{StorageError, StorageErrorKind, StorageOperation};
use crate::filter::QueryPlan;
use crate::schema::{Entity, FieldValue};

trait ErasedSet: Send + Sync {
    fn clone_set(&self) -> Box<dyn ErasedSet>;
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Entity> ErasedSet for Vec<E> {
    fn clone_set(&self) -> Box<dyn ErasedSet> {
        Box::new(self.clone())
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Every stored entity set, keyed by entity type
///
/// Passed to eager-load hooks and named queries so they can read other sets.
#[derive(Default)]
pub struct EntitySets {
    sets: HashMap<TypeId, Box<dyn ErasedSet>>,
}

impl EntitySets {
    /// All stored entities of type `E`, in insertion order
    pub fn all<E: Entity>(&self) -> &[E] {
        self.sets
            .get(&TypeId::of::<E>())
            .and_then(|set| set.as_any().downcast_ref::<Vec<E>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of stored entities of type `E`
    pub fn count<E: Entity>(&self) -> usize {
        self.all::<E>().len()
    }

    fn set_mut<E: Entity>(&mut self) -> StorageResult<&mut Vec<E>> {
        self.sets
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<E>::new()))
            .as_any_mut()
            .downcast_mut::<Vec<E>>()
            .ok_or_else(|| {
                StorageError::new(
                    StorageOperation::Commit,
                    StorageErrorKind::Other,
                    format!("Entity set for `{}` has the wrong type", E::schema().entity_name()),
                )
            })
    }

    fn position<E: Entity>(&self, key: &FieldValue) -> Option<usize> {
        let schema = E::schema();
        self.all::<E>().iter().position(|e| schema.key(e) == *key)
    }
}

impl Clone for EntitySets {
    fn clone(&self) -> Self {
        Self {
            sets: self
                .sets
                .iter()
                .map(|(id, set)| (*id, set.clone_set()))
                .collect(),
        }
    }
}

impl fmt::Debug for EntitySets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySets")
            .field("sets", &self.sets.len())
            .field(
                "entities",
                &self.sets.values().map(|set| set.len()).sum::<usize>(),
            )
            .finish()
    }
}

type IncludeHook = Arc<dyn Fn(&mut dyn Any, &EntitySets) + Send + Sync>;
type NamedQuery = Arc<dyn Fn(&EntitySets) -> Box<dyn Any + Send> + Send + Sync>;

#[derive(Default)]
struct Registry {
    includes: HashMap<(TypeId, String), IncludeHook>,
    queries: HashMap<(TypeId, String), NamedQuery>,
}

/// Shared in-memory store
///
/// Cheap to clone; clones share the same data. Each request takes its own
/// [`MemoryContext`] through [`MemoryStore::context`].
///
/// # Example
///
/// ```rust,ignore
/// let store = MemoryStore::builder()
///     .seed(vec![Country::new("France", 68_000_000, 551_695.0)])
///     .include("cities", |country: &mut Country, sets| {
///         country.cities = sets
///             .all::<City>()
///             .iter()
///             .filter(|c| c.country == country.name)
///             .cloned()
///             .collect();
///     })
///     .build();
///
/// let mut context = store.context();
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    sets: Arc<RwLock<EntitySets>>,
    registry: Arc<Registry>,
}

impl MemoryStore {
    /// Create an empty store with no hooks or named queries
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    /// Open a new unit of work over this store
    pub fn context(&self) -> MemoryContext {
        MemoryContext {
            store: self.clone(),
            pending: Vec::new(),
        }
    }

    /// Snapshot of every committed entity of type `E`
    pub async fn all<E: Entity>(&self) -> Vec<E> {
        self.sets.read().await.all::<E>().to_vec()
    }

    /// Number of committed entities of type `E`
    pub async fn count<E: Entity>(&self) -> usize {
        self.sets.read().await.count::<E>()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("includes", &self.registry.includes.len())
            .field("named_queries", &self.registry.queries.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`MemoryStore`]
#[derive(Default)]
pub struct MemoryStoreBuilder {
    sets: EntitySets,
    registry: Registry,
}

impl MemoryStoreBuilder {
    /// Append initial entities
    #[must_use]
    pub fn seed<E: Entity>(mut self, entities: Vec<E>) -> Self {
        let set = self
            .sets
            .sets
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<E>::new()));
        if let Some(set) = set.as_any_mut().downcast_mut::<Vec<E>>() {
            set.extend(entities);
        }
        self
    }

    /// Register the eager-load hook for relation `name` of `E`
    ///
    /// The hook runs on every fetched entity whose plan includes `name`.
    #[must_use]
    pub fn include<E, F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        E: Entity,
        F: Fn(&mut E, &EntitySets) + Send + Sync + 'static,
    {
        let hook: IncludeHook = Arc::new(move |entity: &mut dyn Any, sets: &EntitySets| {
            if let Some(entity) = entity.downcast_mut::<E>() {
                hook(entity, sets);
            }
        });
        self.registry
            .includes
            .insert((TypeId::of::<E>(), name.into()), hook);
        self
    }

    /// Register a named query producing `E`
    #[must_use]
    pub fn named_query<E, F>(mut self, name: impl Into<String>, query: F) -> Self
    where
        E: Entity,
        F: Fn(&EntitySets) -> Vec<E> + Send + Sync + 'static,
    {
        let query: NamedQuery =
            Arc::new(move |sets: &EntitySets| Box::new(query(sets)) as Box<dyn Any + Send>);
        self.registry
            .queries
            .insert((TypeId::of::<E>(), name.into()), query);
        self
    }

    pub fn build(self) -> MemoryStore {
        MemoryStore {
            sets: Arc::new(RwLock::new(self.sets)),
            registry: Arc::new(self.registry),
        }
    }
}

type ApplyChange = Box<dyn FnOnce(&mut EntitySets) -> StorageResult<usize> + Send + Sync>;

struct PendingChange {
    description: String,
    apply: ApplyChange,
}

/// Request-scoped unit of work over a [`MemoryStore`]
pub struct MemoryContext {
    store: MemoryStore,
    pending: Vec<PendingChange>,
}

impl MemoryContext {
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    fn stage<E: Entity>(&mut self, action: &str, key: FieldValue, apply: ApplyChange) {
        let description = format!("{} {} {}", action, E::schema().entity_name(), key);
        debug!(change = %description, "Staged change");
        self.pending.push(PendingChange { description, apply });
    }
}

fn entity_context<E: Entity>(key: &FieldValue) -> String {
    format!("{}: {}", E::schema().entity_name(), key)
}

impl DataContext for MemoryContext {
    async fn fetch<E: Entity>(&self, plan: &QueryPlan<E>) -> StorageResult<Vec<E>> {
        let type_id = TypeId::of::<E>();
        let hooks = plan
            .includes()
            .iter()
            .map(|name| {
                self.store
                    .registry
                    .includes
                    .get(&(type_id, name.clone()))
                    .ok_or_else(|| {
                        StorageError::unknown_include(name.as_str())
                            .add_context(E::schema().entity_name())
                    })
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let sets = self.store.sets.read().await;
        let mut matched: Vec<E> = sets
            .all::<E>()
            .iter()
            .filter(|e| plan.matches(e))
            .cloned()
            .collect();

        for entity in &mut matched {
            for hook in &hooks {
                hook(&mut *entity, &*sets);
            }
        }
        drop(sets);

        plan.sort(&mut matched);
        debug!(
            entity = E::schema().entity_name(),
            rows = matched.len(),
            includes = ?plan.includes(),
            "Fetched entities"
        );
        Ok(matched)
    }

    async fn find<E: Entity>(&self, key: &FieldValue) -> StorageResult<Option<E>> {
        let schema = E::schema();
        if let Some(message) = schema.key_mismatch(key) {
            return Err(StorageError::invalid_key(message).add_context(schema.entity_name()));
        }
        let sets = self.store.sets.read().await;
        Ok(sets
            .all::<E>()
            .iter()
            .find(|e| schema.key(e) == *key)
            .cloned())
    }

    fn has_named_query<E: Entity>(&self, name: &str) -> bool {
        self.store
            .registry
            .queries
            .contains_key(&(TypeId::of::<E>(), name.to_string()))
    }

    async fn run_named_query<E: Entity>(&self, name: &str) -> StorageResult<Vec<E>> {
        let query = self
            .store
            .registry
            .queries
            .get(&(TypeId::of::<E>(), name.to_string()))
            .ok_or_else(|| StorageError::unknown_query(name).add_context(E::schema().entity_name()))?;

        let sets = self.store.sets.read().await;
        let result = query(&*sets);
        drop(sets);

        result.downcast::<Vec<E>>().map(|rows| *rows).map_err(|_| {
            StorageError::new(
                StorageOperation::NamedQuery,
                StorageErrorKind::Other,
                format!("Named query `{}` returned the wrong entity type", name),
            )
            .add_context(E::schema().entity_name())
        })
    }

    fn add<E: Entity>(&mut self, entity: E) {
        let key = E::schema().key(&entity);
        let staged_key = key.clone();
        self.stage::<E>(
            "add",
            key,
            Box::new(move |sets: &mut EntitySets| {
                if sets.position::<E>(&staged_key).is_some() {
                    return Err(StorageError::already_exists("Entity with this key already stored")
                        .add_context(entity_context::<E>(&staged_key)));
                }
                sets.set_mut::<E>()?.push(entity);
                Ok(1)
            }),
        );
    }

    fn remove<E: Entity>(&mut self, entity: &E) {
        let key = E::schema().key(entity);
        let staged_key = key.clone();
        self.stage::<E>(
            "remove",
            key,
            Box::new(move |sets: &mut EntitySets| {
                let Some(index) = sets.position::<E>(&staged_key) else {
                    return Err(StorageError::concurrency("Expected 1 affected row, found 0")
                        .add_context(entity_context::<E>(&staged_key)));
                };
                sets.set_mut::<E>()?.remove(index);
                Ok(1)
            }),
        );
    }

    fn mark_modified<E: Entity>(&mut self, entity: E) {
        let key = E::schema().key(&entity);
        let staged_key = key.clone();
        self.stage::<E>(
            "modify",
            key,
            Box::new(move |sets: &mut EntitySets| {
                let Some(index) = sets.position::<E>(&staged_key) else {
                    return Err(StorageError::concurrency("Expected 1 affected row, found 0")
                        .add_context(entity_context::<E>(&staged_key)));
                };
                sets.set_mut::<E>()?[index] = entity;
                Ok(1)
            }),
        );
    }

    fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    async fn save_changes(&mut self) -> StorageResult<usize> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(0);
        }

        let mut sets = self.store.sets.write().await;
        let mut working = sets.clone();
        let mut affected = 0;

        for change in pending {
            let PendingChange { description, apply } = change;
            match apply(&mut working) {
                Ok(rows) => affected += rows,
                Err(e) => {
                    warn!(change = %description, error = %e, "Commit rolled back");
                    return Err(e);
                }
            }
        }

        *sets = working;
        info!(rows = affected, "Committed changes");
        Ok(affected)
    }
}

impl fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryContext")
            .field("store", &self.store)
            .field(
                "pending",
                &self
                    .pending
                    .iter()
                    .map(|c| c.description.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

//! Entity schemas
//!
//! A [`Schema`] is an explicit, build-once mapping from field names to typed
//! accessors. Filters resolve field names against it instead of inspecting
//! entities at runtime, so an unknown field is reported before any entity is
//! evaluated.
//!
//! # Example
//!
//! ```rust
//! use once_cell::sync::Lazy;
//! use repokit::schema::{Entity, FieldKind, Schema};
//!
//! #[derive(Clone)]
//! struct Country {
//!     name: String,
//!     population: i64,
//!     capital: Option<String>,
//! }
//!
//! static COUNTRY: Lazy<Schema<Country>> = Lazy::new(|| {
//!     Schema::builder("Country")
//!         .field("name", FieldKind::Text, |c: &Country| c.name.clone())
//!         .field("population", FieldKind::Integer, |c: &Country| c.population)
//!         .nullable("capital", FieldKind::Text, |c: &Country| c.capital.clone())
//!         .key("name")
//!         .build()
//! });
//!
//! impl Entity for Country {
//!     fn schema() -> &'static Schema<Self> {
//!         &COUNTRY
//!     }
//! }
//!
//! assert!(Country::schema().field("population").is_some());
//! assert!(Country::schema().field("Population").is_none());
//! ```

mod value;

pub use value::{CoercionError, FieldKind, FieldValue};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Typed accessor reading one field of an entity
pub type Accessor<E> = Arc<dyn Fn(&E) -> FieldValue + Send + Sync>;

/// An entity type the data-access layer can filter, order and store
///
/// The layer never inspects an entity except through its schema.
pub trait Entity: Clone + Send + Sync + 'static {
    /// The schema describing this entity's fields
    fn schema() -> &'static Schema<Self>;
}

/// One named, typed field of an entity
pub struct Field<E> {
    name: &'static str,
    kind: FieldKind,
    nullable: bool,
    accessor: Accessor<E>,
}

impl<E> Field<E> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Read this field from an entity
    pub fn value(&self, entity: &E) -> FieldValue {
        (self.accessor)(entity)
    }
}

impl<E> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

/// Field registry for one entity type
pub struct Schema<E> {
    entity_name: &'static str,
    fields: Vec<Field<E>>,
    index: HashMap<&'static str, usize>,
    key: usize,
    relations: Vec<&'static str>,
    get_all_query: Option<&'static str>,
}

impl<E> Schema<E> {
    /// Start building a schema for the named entity type
    pub fn builder(entity_name: &'static str) -> SchemaBuilder<E> {
        SchemaBuilder {
            entity_name,
            fields: Vec::new(),
            key: None,
            relations: Vec::new(),
            get_all_query: None,
        }
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    /// Look up a field by its exact (case-sensitive) name
    pub fn field(&self, name: &str) -> Option<&Field<E>> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn fields(&self) -> &[Field<E>] {
        &self.fields
    }

    pub fn key_field(&self) -> &Field<E> {
        &self.fields[self.key]
    }

    /// Read the key of an entity
    pub fn key(&self, entity: &E) -> FieldValue {
        self.key_field().value(entity)
    }

    /// Describe why `key` cannot identify an entity, if it cannot
    ///
    /// A lookup key must be non-null and of the key field's kind.
    pub fn key_mismatch(&self, key: &FieldValue) -> Option<String> {
        let expected = self.key_field().kind();
        match key.kind() {
            Some(kind) if kind == expected => None,
            found => Some(format!(
                "Key of `{}` is {}, found {}",
                self.entity_name,
                expected,
                found.map_or_else(|| "null".to_string(), |k| k.to_string())
            )),
        }
    }

    /// Whether `name` is a declared eager-loadable relation
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.iter().any(|r| *r == name)
    }

    pub fn relations(&self) -> &[&'static str] {
        &self.relations
    }

    /// Named query the repository runs instead of a full scan for `get_all`
    pub fn get_all_query(&self) -> Option<&'static str> {
        self.get_all_query
    }
}

impl<E> fmt::Debug for Schema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("entity_name", &self.entity_name)
            .field("fields", &self.fields)
            .field("key", &self.fields[self.key].name)
            .field("relations", &self.relations)
            .field("get_all_query", &self.get_all_query)
            .finish()
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder<E> {
    entity_name: &'static str,
    fields: Vec<Field<E>>,
    key: Option<&'static str>,
    relations: Vec<&'static str>,
    get_all_query: Option<&'static str>,
}

impl<E> SchemaBuilder<E> {
    /// Declare a non-nullable field
    #[must_use]
    pub fn field<F, V>(self, name: &'static str, kind: FieldKind, accessor: F) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: Into<FieldValue>,
    {
        self.push(name, kind, false, accessor)
    }

    /// Declare a nullable field; the accessor usually returns an `Option`
    #[must_use]
    pub fn nullable<F, V>(self, name: &'static str, kind: FieldKind, accessor: F) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: Into<FieldValue>,
    {
        self.push(name, kind, true, accessor)
    }

    fn push<F, V>(mut self, name: &'static str, kind: FieldKind, nullable: bool, accessor: F) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: Into<FieldValue>,
    {
        self.fields.push(Field {
            name,
            kind,
            nullable,
            accessor: Arc::new(move |entity: &E| accessor(entity).into()),
        });
        self
    }

    /// Mark the field used for lookups by id
    #[must_use]
    pub fn key(mut self, name: &'static str) -> Self {
        self.key = Some(name);
        self
    }

    /// Declare a relation that filters may request to eager-load
    #[must_use]
    pub fn relation(mut self, name: &'static str) -> Self {
        self.relations.push(name);
        self
    }

    /// Run the named query instead of a full scan when listing all entities
    #[must_use]
    pub fn get_all_query(mut self, name: &'static str) -> Self {
        self.get_all_query = Some(name);
        self
    }

    /// Finish the schema
    ///
    /// # Panics
    ///
    /// Panics if a field name is declared twice, if no key was declared, or
    /// if the key does not name a declared field. Schemas are built once at
    /// startup, so these are programming errors.
    pub fn build(self) -> Schema<E> {
        let mut index = HashMap::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            let previous = index.insert(field.name, i);
            assert!(
                previous.is_none(),
                "Duplicate field `{}` in schema for `{}`",
                field.name,
                self.entity_name
            );
        }

        let key_name = self
            .key
            .unwrap_or_else(|| panic!("Schema for `{}` declares no key", self.entity_name));
        let key = *index.get(key_name).unwrap_or_else(|| {
            panic!(
                "Key `{}` is not a field of `{}`",
                key_name, self.entity_name
            )
        });

        Schema {
            entity_name: self.entity_name,
            fields: self.fields,
            index,
            key,
            relations: self.relations,
            get_all_query: self.get_all_query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Country;

    #[test]
    fn test_field_lookup_is_exact() {
        let schema = Country::schema();
        assert_eq!(schema.entity_name(), "Country");
        assert_eq!(schema.field("population").unwrap().kind(), FieldKind::Integer);
        assert!(schema.field("Population").is_none());
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_key_reads_entity() {
        let france = Country::new("France", 68_000_000, 551_695.0);
        assert_eq!(
            Country::schema().key(&france),
            FieldValue::Text("France".to_string())
        );
    }

    #[test]
    fn test_key_mismatch() {
        let schema = Country::schema();
        assert_eq!(schema.key_mismatch(&FieldValue::from("France")), None);
        assert_eq!(
            schema.key_mismatch(&FieldValue::Integer(1)).as_deref(),
            Some("Key of `Country` is text, found integer")
        );
        assert_eq!(
            schema.key_mismatch(&FieldValue::Null).as_deref(),
            Some("Key of `Country` is text, found null")
        );
    }

    #[test]
    fn test_nullable_field_reports_null() {
        let atlantis = Country::new("Atlantis", 0, 1.0);
        let capital = Country::schema().field("capital").unwrap();
        assert!(capital.is_nullable());
        assert_eq!(capital.value(&atlantis), FieldValue::Null);
    }

    #[test]
    fn test_relations_declared() {
        assert!(Country::schema().has_relation("cities"));
        assert!(!Country::schema().has_relation("rivers"));
    }

    #[derive(Clone)]
    struct Pair {
        a: i64,
    }

    #[test]
    #[should_panic(expected = "Duplicate field `a`")]
    fn test_duplicate_field_panics() {
        let _ = Schema::<Pair>::builder("Pair")
            .field("a", FieldKind::Integer, |p: &Pair| p.a)
            .field("a", FieldKind::Integer, |p: &Pair| p.a)
            .key("a")
            .build();
    }

    #[test]
    #[should_panic(expected = "declares no key")]
    fn test_missing_key_panics() {
        let _ = Schema::<Pair>::builder("Pair")
            .field("a", FieldKind::Integer, |p: &Pair| p.a)
            .build();
    }
}

use std::fmt;

use tracing::warn;

use super::{FilterError, OrderDirection, Predicate};
use crate::schema::{Entity, Field, Schema};

/// Field and direction a result set is ordered by
pub struct SortKey<E: 'static> {
    field: &'static Field<E>,
    direction: OrderDirection,
}

impl<E: 'static> SortKey<E> {
    pub fn field_name(&self) -> &'static str {
        self.field.name()
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

impl<E: 'static> Clone for SortKey<E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            direction: self.direction,
        }
    }
}

impl<E: 'static> fmt::Debug for SortKey<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field.name(), self.direction)
    }
}

/// A validated, ready-to-run query
///
/// Produced by compiling a [`QueryFilter`](super::QueryFilter) or an
/// [`ExpressionFilter`](crate::expression::ExpressionFilter). Every field
/// reference has been resolved and every literal converted, so running the
/// plan cannot fail. Include names are carried for the persistence context,
/// which performs the eager loading.
pub struct QueryPlan<E: Entity> {
    predicate: Predicate<E>,
    includes: Vec<String>,
    order: Option<SortKey<E>>,
}

impl<E: Entity> QueryPlan<E> {
    pub(crate) fn new(predicate: Predicate<E>, includes: Vec<String>, order: Option<SortKey<E>>) -> Self {
        Self {
            predicate,
            includes,
            order,
        }
    }

    /// Plan matching every entity, unordered, with no includes
    pub fn all() -> Self {
        Self::new(Predicate::Const(true), Vec::new(), None)
    }

    pub fn predicate(&self) -> &Predicate<E> {
        &self.predicate
    }

    pub fn matches(&self, entity: &E) -> bool {
        self.predicate.matches(entity)
    }

    /// Relations the context should eager-load on each result
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn order(&self) -> Option<&SortKey<E>> {
        self.order.as_ref()
    }

    /// Order items in place
    ///
    /// The sort is stable in both directions, so entities with equal keys
    /// keep their relative order. Null keys sort first when ascending.
    pub fn sort(&self, items: &mut [E]) {
        let Some(key) = &self.order else {
            return;
        };
        items.sort_by(|a, b| {
            let ordering = key.field.value(a).sort_cmp(&key.field.value(b));
            match key.direction {
                OrderDirection::Ascending => ordering,
                OrderDirection::Descending => ordering.reverse(),
            }
        });
    }

    /// Filter and order an in-memory slice
    ///
    /// Includes are not applied; there is no context to load them from.
    pub fn apply(&self, items: &[E]) -> Vec<E> {
        let mut matched: Vec<E> = items.iter().filter(|e| self.matches(e)).cloned().collect();
        self.sort(&mut matched);
        matched
    }
}

impl<E: Entity> Clone for QueryPlan<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            includes: self.includes.clone(),
            order: self.order.clone(),
        }
    }
}

impl<E: Entity> fmt::Debug for QueryPlan<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPlan")
            .field("entity", &E::schema().entity_name())
            .field("predicate", &self.predicate)
            .field("includes", &self.includes)
            .field("order", &self.order)
            .finish()
    }
}

/// Resolve an order-by field name
///
/// An empty name means no ordering. A name the schema does not declare is
/// ignored with a warning rather than rejected.
pub(crate) fn resolve_order<E: 'static>(
    schema: &'static Schema<E>,
    name: Option<&str>,
    descending: bool,
) -> Option<SortKey<E>> {
    let name = name.filter(|n| !n.is_empty())?;
    match schema.field(name) {
        Some(field) => Some(SortKey {
            field,
            direction: OrderDirection::from_descending(descending),
        }),
        None => {
            warn!(
                entity = schema.entity_name(),
                order_by = name,
                "Ignoring order-by on unknown field"
            );
            None
        }
    }
}

/// Check every include name against the schema's declared relations
pub(crate) fn resolve_includes<E: 'static>(
    schema: &'static Schema<E>,
    names: &[String],
) -> Result<Vec<String>, FilterError> {
    for name in names {
        if !schema.has_relation(name) {
            return Err(FilterError::UnknownRelation {
                entity: schema.entity_name().to_string(),
                relation: name.clone(),
            });
        }
    }
    Ok(names.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{countries, names, Country};

    fn ordered(name: &str, descending: bool) -> QueryPlan<Country> {
        let order = resolve_order(Country::schema(), Some(name), descending);
        assert!(order.is_some());
        QueryPlan::new(Predicate::Const(true), Vec::new(), order)
    }

    #[test]
    fn test_all_keeps_source_order() {
        let items = countries();
        assert_eq!(
            names(&QueryPlan::all().apply(&items)),
            ["France", "Austria", "Finland", "Fiji", "Atlantis"]
        );
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let items = countries();
        assert_eq!(
            names(&ordered("name", false).apply(&items)),
            ["Atlantis", "Austria", "Fiji", "Finland", "France"]
        );
        assert_eq!(
            names(&ordered("name", true).apply(&items)),
            ["France", "Finland", "Fiji", "Austria", "Atlantis"]
        );
    }

    #[test]
    fn test_sort_ties_keep_insertion_order() {
        // Austria and Atlantis share a population, Austria was inserted first
        let items = countries();
        assert_eq!(
            names(&ordered("population", false).apply(&items)),
            ["Fiji", "Finland", "Austria", "Atlantis", "France"]
        );
        assert_eq!(
            names(&ordered("population", true).apply(&items)),
            ["France", "Austria", "Atlantis", "Finland", "Fiji"]
        );
    }

    #[test]
    fn test_sort_nulls_first_ascending() {
        let items = countries();
        let sorted = ordered("capital", false).apply(&items);
        assert_eq!(sorted[0].name, "Atlantis");
        let sorted = ordered("capital", true).apply(&items);
        assert_eq!(sorted.last().map(|c| c.name.as_str()), Some("Atlantis"));
    }

    #[test]
    fn test_unknown_order_is_ignored() {
        assert!(resolve_order(Country::schema(), Some("Name"), false).is_none());
        assert!(resolve_order(Country::schema(), Some(""), true).is_none());
        assert!(resolve_order(Country::schema(), None, true).is_none());
    }

    #[test]
    fn test_includes_must_be_relations() {
        let ok = resolve_includes(Country::schema(), &["cities".to_string()]).unwrap();
        assert_eq!(ok, ["cities"]);

        let err = resolve_includes(Country::schema(), &["rivers".to_string()]).unwrap_err();
        assert!(matches!(err, FilterError::UnknownRelation { ref relation, .. } if relation == "rivers"));
    }
}

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    resolve_includes, resolve_order, Comparison, CustomPredicate, FilterError, FilterOptions,
    FilterProperty, Predicate, QueryPlan,
};
use crate::schema::{Entity, FieldKind, FieldValue};

/// Serializable structured filter over an entity type
///
/// Descriptors are ANDed in the order given, followed by any caller-supplied
/// predicates. Include names are forwarded to the persistence context for
/// eager loading and the result is optionally ordered by one field.
///
/// Custom predicates are code, so they are never serialized; a deserialized
/// filter starts without any.
///
/// # Example
///
/// ```rust,ignore
/// use repokit::filter::{FilterProperty, QueryFilter};
///
/// let filter: QueryFilter<Country> = serde_json::from_str(r#"{
///     "filterProperties": [
///         {"name": "population", "value": "1000000", "operator": "GreaterThan"}
///     ],
///     "includePropertyNames": ["cities"],
///     "orderByPropertyName": "name",
///     "orderByDescending": true
/// }"#)?;
/// ```
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct QueryFilter<E: Entity> {
    #[serde(default)]
    pub include_property_names: Vec<String>,

    #[serde(default)]
    pub filter_properties: Vec<FilterProperty>,

    /// Field to order by; empty or absent leaves the source order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by_property_name: Option<String>,

    #[serde(default)]
    pub order_by_descending: bool,

    #[serde(skip)]
    custom_predicates: Vec<CustomPredicate<E>>,
}

impl<E: Entity> QueryFilter<E> {
    pub fn new() -> Self {
        Self {
            include_property_names: Vec::new(),
            filter_properties: Vec::new(),
            order_by_property_name: None,
            order_by_descending: false,
            custom_predicates: Vec::new(),
        }
    }

    /// Add a descriptor
    #[must_use]
    pub fn with_property(mut self, property: FilterProperty) -> Self {
        self.filter_properties.push(property);
        self
    }

    /// Request eager loading of a relation
    #[must_use]
    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.include_property_names.push(relation.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by_property_name = Some(field.into());
        self.order_by_descending = descending;
        self
    }

    /// Add a caller-supplied predicate, builder style
    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.add_custom_predicate(predicate);
        self
    }

    /// Append a caller-supplied predicate, ANDed after the descriptors
    pub fn add_custom_predicate<F>(&mut self, predicate: F)
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.custom_predicates.push(Arc::new(predicate));
    }

    pub fn custom_predicates(&self) -> &[CustomPredicate<E>] {
        &self.custom_predicates
    }

    /// Translate the filter into a query plan
    ///
    /// Fails on the first descriptor that names an unknown field or carries
    /// a literal that does not convert to the field's kind, and on include
    /// names the schema does not declare as relations. No entity is
    /// evaluated before translation succeeds.
    ///
    /// Text-only operators on non-text fields add no condition once their
    /// literal has converted.
    pub fn compile(&self, options: &FilterOptions) -> Result<QueryPlan<E>, FilterError> {
        let schema = E::schema();
        let mut predicates =
            Vec::with_capacity(self.filter_properties.len() + self.custom_predicates.len());

        for property in &self.filter_properties {
            let field = schema
                .field(&property.name)
                .ok_or_else(|| FilterError::missing_field(schema.entity_name(), &property.name))?;

            let target = FieldValue::parse(field.kind(), &property.value).map_err(|source| {
                FilterError::Conversion {
                    field: property.name.clone(),
                    source,
                }
            })?;

            if property.operator.is_text_only() && field.kind() != FieldKind::Text {
                warn!(
                    entity = schema.entity_name(),
                    field = field.name(),
                    operator = %property.operator,
                    kind = %field.kind(),
                    "Text operator on non-text field adds no condition"
                );
                continue;
            }

            predicates.push(Predicate::Compare(Comparison::new(
                field,
                property.operator,
                target,
                options.text_case(property.case_sensitive),
            )));
        }

        predicates.extend(self.custom_predicates.iter().cloned().map(Predicate::Custom));

        let includes = resolve_includes(schema, &self.include_property_names)?;
        let order = resolve_order(
            schema,
            self.order_by_property_name.as_deref(),
            self.order_by_descending,
        );

        let plan = QueryPlan::new(Predicate::And(predicates), includes, order);
        debug!(entity = schema.entity_name(), plan = ?plan, "Compiled query filter");
        Ok(plan)
    }

    /// Apply the filter to an in-memory slice
    ///
    /// Includes are validated but not loaded.
    pub fn filter_list(&self, items: &[E], options: &FilterOptions) -> Result<Vec<E>, FilterError> {
        Ok(self.compile(options)?.apply(items))
    }
}

impl<E: Entity> Default for QueryFilter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for QueryFilter<E> {
    fn clone(&self) -> Self {
        Self {
            include_property_names: self.include_property_names.clone(),
            filter_properties: self.filter_properties.clone(),
            order_by_property_name: self.order_by_property_name.clone(),
            order_by_descending: self.order_by_descending,
            custom_predicates: self.custom_predicates.clone(),
        }
    }
}

impl<E: Entity> fmt::Debug for QueryFilter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryFilter")
            .field("include_property_names", &self.include_property_names)
            .field("filter_properties", &self.filter_properties)
            .field("order_by_property_name", &self.order_by_property_name)
            .field("order_by_descending", &self.order_by_descending)
            .field("custom_predicates", &self.custom_predicates.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::filter::CaseSensitivity;
    use crate::testing::{countries, names, Country};
    use serde_json::json;

    fn run(filter: &QueryFilter<Country>) -> Vec<Country> {
        filter
            .filter_list(&countries(), &FilterOptions::default())
            .unwrap()
    }

    #[test]
    fn test_empty_filter_returns_everything_in_order() {
        let result = run(&QueryFilter::new());
        assert_eq!(
            names(&result),
            ["France", "Austria", "Finland", "Fiji", "Atlantis"]
        );
    }

    #[test]
    fn test_greater_than_is_strict() {
        let filter = QueryFilter::new().with_property(FilterProperty::gt("population", 9_100_000));
        assert_eq!(names(&run(&filter)), ["France"]);
    }

    #[test]
    fn test_less_than_or_equal_includes_equal() {
        let filter = QueryFilter::new().with_property(FilterProperty::le("population", 9_100_000));
        assert_eq!(
            names(&run(&filter)),
            ["Austria", "Finland", "Fiji", "Atlantis"]
        );
    }

    #[test]
    fn test_and_is_intersection() {
        let a = FilterProperty::starts_with("name", "F");
        let b = FilterProperty::ge("area", 100_000.0);

        let only_a = run(&QueryFilter::new().with_property(a.clone()));
        let only_b = run(&QueryFilter::new().with_property(b.clone()));
        let both = run(&QueryFilter::new().with_property(a).with_property(b));

        let intersection: Vec<_> = only_a.into_iter().filter(|c| only_b.contains(c)).collect();
        assert_eq!(both, intersection);
        assert_eq!(names(&both), ["France", "Finland"]);
    }

    #[test]
    fn test_unknown_field_fails_before_evaluation() {
        let evaluated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluated);
        let filter = QueryFilter::<Country>::new()
            .with_property(FilterProperty::eq("population", 5))
            .with_property(FilterProperty::eq("Population", 5))
            .with_predicate(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            });

        let err = filter
            .filter_list(&countries(), &FilterOptions::default())
            .unwrap_err();

        assert_eq!(
            err,
            FilterError::MissingField {
                entity: "Country".into(),
                field: "Population".into()
            }
        );
        assert_eq!(evaluated.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unconvertible_literal() {
        let filter = QueryFilter::<Country>::new().with_property(FilterProperty::gt("population", "many"));
        let err = filter
            .filter_list(&countries(), &FilterOptions::default())
            .unwrap_err();
        assert!(matches!(err, FilterError::Conversion { ref field, .. } if field == "population"));
    }

    #[test]
    fn test_text_operator_on_number_adds_no_condition() {
        let filter = QueryFilter::new().with_property(FilterProperty::contains("population", "9"));
        assert_eq!(run(&filter).len(), 5);
    }

    #[test]
    fn test_text_operator_on_number_still_converts_literal() {
        let filter = QueryFilter::<Country>::new()
            .with_property(FilterProperty::contains("population", "zzz"));
        let err = filter.compile(&FilterOptions::default()).unwrap_err();
        assert!(matches!(err, FilterError::Conversion { ref field, .. } if field == "population"));
    }

    #[test]
    fn test_null_field_semantics() {
        let eq = QueryFilter::new().with_property(FilterProperty::eq("capital", "Suva"));
        assert_eq!(names(&run(&eq)), ["Fiji"]);

        let ne = QueryFilter::new().with_property(FilterProperty::ne("capital", "Suva"));
        assert_eq!(
            names(&run(&ne)),
            ["France", "Austria", "Finland", "Atlantis"]
        );

        let lt = QueryFilter::new().with_property(FilterProperty::lt("capital", "ZZZ"));
        assert!(!names(&run(&lt)).contains(&"Atlantis"));
    }

    #[test]
    fn test_timestamp_and_boolean_fields() {
        let joined = QueryFilter::new().with_property(FilterProperty::eq("joined_un", "1955-12-14"));
        assert_eq!(names(&run(&joined)), ["Austria", "Finland"]);

        let landlocked = QueryFilter::new().with_property(FilterProperty::eq("landlocked", "True"));
        assert_eq!(names(&run(&landlocked)), ["Austria"]);
    }

    #[test]
    fn test_case_flag_ignored_by_default() {
        let filter = QueryFilter::new().with_property(FilterProperty::starts_with("name", "fi"));
        assert!(run(&filter).is_empty());
    }

    #[test]
    fn test_case_flag_honored_when_configured() {
        let options = FilterOptions {
            case_sensitivity: CaseSensitivity::Honor,
            ..FilterOptions::default()
        };
        let insensitive = QueryFilter::<Country>::new().with_property(FilterProperty::starts_with("name", "fi"));
        assert_eq!(
            names(&insensitive.filter_list(&countries(), &options).unwrap()),
            ["Finland", "Fiji"]
        );

        let sensitive = QueryFilter::<Country>::new()
            .with_property(FilterProperty::starts_with("name", "fi").case_sensitive(true));
        assert!(sensitive.filter_list(&countries(), &options).unwrap().is_empty());
    }

    #[test]
    fn test_custom_predicates_are_anded() {
        let mut filter = QueryFilter::new().with_property(FilterProperty::starts_with("name", "F"));
        filter.add_custom_predicate(|c: &Country| c.landlocked || c.area > 400_000.0);
        assert_eq!(names(&run(&filter)), ["France"]);
    }

    #[test]
    fn test_order_by_and_unknown_order() {
        let asc = QueryFilter::new().order_by("area", false);
        assert_eq!(
            names(&run(&asc)),
            ["Atlantis", "Fiji", "Austria", "Finland", "France"]
        );

        let unknown = QueryFilter::new().order_by("Area", true);
        assert_eq!(
            names(&run(&unknown)),
            ["France", "Austria", "Finland", "Fiji", "Atlantis"]
        );
    }

    #[test]
    fn test_unknown_include_rejected() {
        let filter = QueryFilter::<Country>::new().include("rivers");
        assert!(matches!(
            filter.compile(&FilterOptions::default()),
            Err(FilterError::UnknownRelation { .. })
        ));
    }

    #[test]
    fn test_wire_format() {
        let filter: QueryFilter<Country> = serde_json::from_value(json!({
            "filterProperties": [
                {"name": "population", "value": "1000000", "operator": "GreaterThan"}
            ],
            "includePropertyNames": ["cities"],
            "orderByPropertyName": "name",
            "orderByDescending": true
        }))
        .unwrap();

        assert_eq!(filter.filter_properties.len(), 1);
        assert_eq!(filter.include_property_names, ["cities"]);
        assert_eq!(names(&run(&filter)), ["France", "Finland", "Austria", "Atlantis"]);

        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["orderByPropertyName"], "name");
        assert_eq!(value["filterProperties"][0]["operator"], "GreaterThan");
    }
}

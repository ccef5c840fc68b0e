use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{compile, Expr};
use crate::filter::{resolve_includes, resolve_order, FilterError, FilterOptions, QueryPlan};
use crate::schema::Entity;

/// Filter carrying a serialized predicate expression
///
/// The expression text is only parsed when the filter is compiled, so a
/// filter received over the wire can be stored and forwarded untouched.
/// Includes and ordering behave exactly as in
/// [`QueryFilter`](crate::filter::QueryFilter).
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct ExpressionFilter<E: Entity> {
    /// Versioned serialized [`Expr`]
    pub expression: String,

    #[serde(default)]
    pub include_property_names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by_property_name: Option<String>,

    #[serde(default)]
    pub order_by_descending: bool,

    #[serde(skip)]
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> ExpressionFilter<E> {
    /// Serialize `expr` into a new filter
    pub fn new(expr: &Expr) -> Result<Self, FilterError> {
        Ok(Self::from_text(expr.to_text()?))
    }

    /// Wrap already-serialized expression text
    pub fn from_text(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            include_property_names: Vec::new(),
            order_by_property_name: None,
            order_by_descending: false,
            _entity: PhantomData,
        }
    }

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

    /// Parse the carried expression
    pub fn expr(&self) -> Result<Expr, FilterError> {
        Expr::from_text(&self.expression)
    }

    /// Translate the filter into a query plan
    ///
    /// Malformed text, an unsupported version, unknown fields, incompatible
    /// values and excessive nesting all fail here, before any entity is
    /// evaluated.
    pub fn compile(&self, options: &FilterOptions) -> Result<QueryPlan<E>, FilterError> {
        let schema = E::schema();
        let predicate = compile(&self.expr()?, options)?;
        let includes = resolve_includes(schema, &self.include_property_names)?;
        let order = resolve_order(
            schema,
            self.order_by_property_name.as_deref(),
            self.order_by_descending,
        );

        let plan = QueryPlan::new(predicate, includes, order);
        debug!(entity = schema.entity_name(), plan = ?plan, "Compiled expression filter");
        Ok(plan)
    }

    /// Apply the filter to an in-memory slice
    pub fn filter_list(&self, items: &[E], options: &FilterOptions) -> Result<Vec<E>, FilterError> {
        Ok(self.compile(options)?.apply(items))
    }
}

impl<E: Entity> Clone for ExpressionFilter<E> {
    fn clone(&self) -> Self {
        Self {
            expression: self.expression.clone(),
            include_property_names: self.include_property_names.clone(),
            order_by_property_name: self.order_by_property_name.clone(),
            order_by_descending: self.order_by_descending,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for ExpressionFilter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionFilter")
            .field("expression", &self.expression)
            .field("include_property_names", &self.include_property_names)
            .field("order_by_property_name", &self.order_by_property_name)
            .field("order_by_descending", &self.order_by_descending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterProperty, QueryFilter};
    use crate::testing::{countries, names, Country};

    #[test]
    fn test_round_trip_matches_direct_evaluation() {
        let expr = Expr::and(vec![
            Expr::field("population").ge(1_000_000),
            Expr::field("name").starts_with("F"),
        ]);
        let options = FilterOptions::default();

        let direct = compile::<Country>(&expr, &options).unwrap();
        let expected: Vec<_> = countries().into_iter().filter(|c| direct.matches(c)).collect();

        let filter = ExpressionFilter::<Country>::new(&expr).unwrap();
        let wire = serde_json::to_string(&filter).unwrap();
        let received: ExpressionFilter<Country> = serde_json::from_str(&wire).unwrap();

        assert_eq!(received.expr().unwrap(), expr);
        assert_eq!(received.filter_list(&countries(), &options).unwrap(), expected);
        assert_eq!(names(&expected), ["France", "Finland"]);
    }

    #[test]
    fn test_agrees_with_structured_filter() {
        let options = FilterOptions::default();
        let structured = QueryFilter::<Country>::new()
            .with_property(FilterProperty::lt("area", 100_000))
            .with_property(FilterProperty::ne("name", "Fiji"))
            .order_by("name", true);
        let expression = ExpressionFilter::<Country>::new(&Expr::and(vec![
            Expr::field("area").lt(100_000.0),
            Expr::field("name").ne("Fiji"),
        ]))
        .unwrap()
        .order_by("name", true);

        assert_eq!(
            structured.filter_list(&countries(), &options).unwrap(),
            expression.filter_list(&countries(), &options).unwrap()
        );
    }

    #[test]
    fn test_malformed_text_fails_without_results() {
        let filter = ExpressionFilter::<Country>::from_text("population > 5");
        assert!(matches!(
            filter.filter_list(&countries(), &FilterOptions::default()),
            Err(FilterError::Deserialize(_))
        ));
    }

    #[test]
    fn test_includes_validated() {
        let filter = ExpressionFilter::<Country>::new(&Expr::constant(true))
            .unwrap()
            .include("cities")
            .include("rivers");
        assert!(matches!(
            filter.compile(&FilterOptions::default()),
            Err(FilterError::UnknownRelation { .. })
        ));
    }

    #[test]
    fn test_wire_names() {
        let filter = ExpressionFilter::<Country>::new(&Expr::constant(false))
            .unwrap()
            .include("cities")
            .order_by("area", false);
        let value = serde_json::to_value(&filter).unwrap();
        assert!(value["expression"].is_string());
        assert_eq!(value["includePropertyNames"][0], "cities");
        assert_eq!(value["orderByPropertyName"], "area");
        assert_eq!(value["orderByDescending"], false);
    }
}

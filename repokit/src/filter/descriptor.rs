use std::fmt;

use serde::{Deserialize, Serialize};

use super::FilterOperator;

/// A single comparison within a [`QueryFilter`](super::QueryFilter)
///
/// The literal is carried as a string and converted to the field's kind when
/// the filter is compiled. Serialized as
/// `{"name", "value", "operator", "caseSensitive"}`.
///
/// # Example
///
/// ```rust
/// use repokit::filter::{FilterOperator, FilterProperty};
///
/// let prop = FilterProperty::ge("population", 1_000_000);
/// assert_eq!(prop.value, "1000000");
/// assert_eq!(prop.operator, FilterOperator::GreaterThanOrEqual);
///
/// let json = serde_json::to_value(&prop).unwrap();
/// assert_eq!(json["caseSensitive"], false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterProperty {
    /// Field name, matched exactly against the entity schema
    #[serde(default)]
    pub name: String,
    /// Literal to compare against
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub operator: FilterOperator,
    /// Only consulted when case sensitivity is configured to be honored
    #[serde(default)]
    pub case_sensitive: bool,
}

impl FilterProperty {
    pub fn new(name: impl Into<String>, operator: FilterOperator, value: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
            operator,
            case_sensitive: false,
        }
    }

    /// Equality (field = value)
    pub fn eq(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::Equals, value)
    }

    /// Inequality (field != value)
    pub fn ne(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::NotEquals, value)
    }

    pub fn lt(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::LessThan, value)
    }

    pub fn le(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::LessThanOrEqual, value)
    }

    pub fn gt(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::GreaterThan, value)
    }

    pub fn ge(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::GreaterThanOrEqual, value)
    }

    pub fn starts_with(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::StartsWith, value)
    }

    pub fn ends_with(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::EndsWith, value)
    }

    pub fn contains(name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(name, FilterOperator::Contains, value)
    }

    /// Set the case-sensitive flag
    #[must_use]
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

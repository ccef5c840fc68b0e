use thiserror::Error;

use super::FilterOperator;
use crate::schema::{CoercionError, FieldKind};

/// A filter could not be translated into a query plan
///
/// Raised before any entity is evaluated; a failing filter never produces
/// partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// The filter names a field the entity schema does not declare
    #[error("`{entity}` has no field named `{field}`")]
    MissingField { entity: String, field: String },

    /// A string literal could not be converted to the field's kind
    #[error("invalid value for field `{field}`: {source}")]
    Conversion {
        field: String,
        #[source]
        source: CoercionError,
    },

    /// A serialized literal has a JSON type incompatible with the field
    #[error("field `{field}` expects {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: FieldKind,
        found: String,
    },

    /// An include names a relation the entity schema does not declare
    #[error("`{entity}` has no relation named `{relation}`")]
    UnknownRelation { entity: String, relation: String },

    /// The operator cannot be applied to the operand
    #[error("operator {operator} cannot be applied to field `{field}`: {reason}")]
    UnsupportedOperator {
        field: String,
        operator: FilterOperator,
        reason: String,
    },

    /// The serialized expression is not valid
    #[error("malformed expression: {0}")]
    Deserialize(String),

    /// The serialized expression was written by an unknown format version
    #[error("unsupported expression version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u64 },

    /// The expression nests deeper than allowed
    #[error("expression nesting exceeds the maximum depth of {max}")]
    TooDeep { max: usize },

    /// The expression could not be serialized
    #[error("cannot serialize expression: {0}")]
    Serialize(String),
}

impl FilterError {
    pub(crate) fn missing_field(entity: &str, field: &str) -> Self {
        Self::MissingField {
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = FilterError::missing_field("Country", "Population");
        assert_eq!(err.to_string(), "`Country` has no field named `Population`");
    }

    #[test]
    fn test_conversion_keeps_source() {
        let source = crate::schema::FieldValue::parse(FieldKind::Integer, "lots").unwrap_err();
        let err = FilterError::Conversion {
            field: "population".into(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("population"));
    }
}

use serde_json::Value;

use super::Expr;
use crate::filter::{Comparison, FilterError, FilterOptions, Predicate, TextCase};
use crate::schema::{Entity, FieldKind, FieldValue};

/// Compile an expression into a predicate over `E`
///
/// Every field is resolved and every value converted up front, so the
/// returned predicate cannot fail. Comparisons are case-sensitive.
pub fn compile<E: Entity>(expr: &Expr, options: &FilterOptions) -> Result<Predicate<E>, FilterError> {
    compile_inner(expr, options.max_expression_depth, 1)
}

fn compile_inner<E: Entity>(expr: &Expr, max: usize, depth: usize) -> Result<Predicate<E>, FilterError> {
    if depth > max {
        return Err(FilterError::TooDeep { max });
    }

    let compile_all = |operands: &[Expr]| {
        operands
            .iter()
            .map(|operand| compile_inner::<E>(operand, max, depth + 1))
            .collect::<Result<Vec<_>, _>>()
    };

    match expr {
        Expr::Const { value } => Ok(Predicate::Const(*value)),
        Expr::And { operands } => Ok(Predicate::And(compile_all(operands)?)),
        Expr::Or { operands } => Ok(Predicate::Or(compile_all(operands)?)),
        Expr::Not { operand } => Ok(Predicate::Not(Box::new(compile_inner(
            operand,
            max,
            depth + 1,
        )?))),
        Expr::Compare { field, op, value } => {
            let schema = E::schema();
            let resolved = schema
                .field(field)
                .ok_or_else(|| FilterError::missing_field(schema.entity_name(), field))?;
            let kind = resolved.kind();

            if op.is_text_only() && kind != FieldKind::Text {
                return Err(FilterError::UnsupportedOperator {
                    field: field.clone(),
                    operator: *op,
                    reason: format!("field is {}, not text", kind),
                });
            }

            let target = convert(field, kind, value)?;
            if target.is_null() {
                if !resolved.is_nullable() {
                    return Err(FilterError::TypeMismatch {
                        field: field.clone(),
                        expected: kind,
                        found: "null".to_string(),
                    });
                }
                if !op.is_equality() {
                    return Err(FilterError::UnsupportedOperator {
                        field: field.clone(),
                        operator: *op,
                        reason: "null only supports Equals and NotEquals".to_string(),
                    });
                }
            }

            Ok(Predicate::Compare(Comparison::new(
                resolved,
                *op,
                target,
                TextCase::Sensitive,
            )))
        }
    }
}

fn convert(field: &str, kind: FieldKind, value: &Value) -> Result<FieldValue, FilterError> {
    FieldValue::from_json(kind, value).map_err(|source| match (kind, value) {
        // The JSON type fits; the string itself is not a valid timestamp/uuid
        (FieldKind::Timestamp | FieldKind::Uuid, Value::String(_)) => FilterError::Conversion {
            field: field.to_string(),
            source,
        },
        _ => FilterError::TypeMismatch {
            field: field.to_string(),
            expected: kind,
            found: json_type_name(value).to_string(),
        },
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOperator;
    use crate::testing::{countries, Country};
    use serde_json::json;

    fn compile_country(expr: &Expr) -> Result<Predicate<Country>, FilterError> {
        compile(expr, &FilterOptions::default())
    }

    fn matching(expr: &Expr) -> Vec<String> {
        let predicate = compile_country(expr).unwrap();
        countries()
            .into_iter()
            .filter(|c| predicate.matches(c))
            .map(|c| c.name)
            .collect()
    }

    #[test]
    fn test_compiles_comparison_tree() {
        let expr = Expr::or(vec![
            Expr::field("area").lt(20_000),
            Expr::and(vec![
                Expr::field("landlocked").eq(true),
                Expr::not(Expr::field("name").ends_with("ia")),
            ]),
        ]);
        assert_eq!(matching(&expr), ["Fiji", "Atlantis"]);
    }

    #[test]
    fn test_null_comparisons() {
        assert_eq!(matching(&Expr::field("capital").is_null()), ["Atlantis"]);
        assert_eq!(matching(&Expr::field("joined_un").is_not_null()).len(), 3);
    }

    #[test]
    fn test_timestamp_value() {
        let expr = Expr::field("joined_un").lt("1950-01-01T00:00:00Z");
        assert_eq!(matching(&expr), ["France"]);
    }

    #[test]
    fn test_unknown_field() {
        let err = compile_country(&Expr::field("Name").eq("France")).unwrap_err();
        assert!(matches!(err, FilterError::MissingField { ref field, .. } if field == "Name"));
    }

    #[test]
    fn test_type_mismatch() {
        let err = compile_country(&Expr::field("population").eq("12")).unwrap_err();
        assert_eq!(
            err,
            FilterError::TypeMismatch {
                field: "population".into(),
                expected: FieldKind::Integer,
                found: "string".into()
            }
        );

        let err = compile_country(&Expr::field("population").eq(1.5)).unwrap_err();
        assert!(matches!(err, FilterError::TypeMismatch { ref found, .. } if found == "float"));
    }

    #[test]
    fn test_null_on_non_nullable_field() {
        let err = compile_country(&Expr::field("name").is_null()).unwrap_err();
        assert!(matches!(err, FilterError::TypeMismatch { ref found, .. } if found == "null"));
    }

    #[test]
    fn test_ordering_against_null_rejected() {
        let expr = Expr::field("capital").compare(FilterOperator::LessThan, json!(null));
        assert!(matches!(
            compile_country(&expr),
            Err(FilterError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn test_text_operator_on_number_rejected() {
        let expr = Expr::field("population").compare(FilterOperator::Contains, json!("9"));
        assert!(matches!(
            compile_country(&expr),
            Err(FilterError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn test_invalid_timestamp_string() {
        let err = compile_country(&Expr::field("joined_un").eq("yesterday")).unwrap_err();
        assert!(matches!(err, FilterError::Conversion { .. }));
    }

    #[test]
    fn test_depth_limit() {
        let mut expr = Expr::field("population").gt(0);
        for _ in 0..5 {
            expr = Expr::not(expr);
        }
        assert_eq!(expr.depth(), 6);

        let tight = FilterOptions {
            max_expression_depth: 5,
            ..FilterOptions::default()
        };
        assert_eq!(
            compile::<Country>(&expr, &tight).unwrap_err(),
            FilterError::TooDeep { max: 5 }
        );

        let loose = FilterOptions {
            max_expression_depth: 6,
            ..FilterOptions::default()
        };
        assert!(compile::<Country>(&expr, &loose).is_ok());
    }
}

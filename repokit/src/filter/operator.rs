//! Comparison operators shared by both filter kinds

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::FieldValue;

/// Comparison applied between a field value and a literal
///
/// Serialized as the PascalCase variant name, e.g. `"GreaterThanOrEqual"`.
///
/// # Example
///
/// ```rust
/// use repokit::filter::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::LessThanOrEqual), "<=");
/// assert!(FilterOperator::Contains.is_text_only());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equal to (=)
    #[default]
    Equals,
    /// Not equal to (!=)
    NotEquals,
    /// Text starts with the literal
    StartsWith,
    /// Text ends with the literal
    EndsWith,
    /// Text contains the literal
    Contains,
    /// Less than (<)
    LessThan,
    /// Greater than (>)
    GreaterThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals => write!(f, "="),
            Self::NotEquals => write!(f, "!="),
            Self::StartsWith => write!(f, "STARTS WITH"),
            Self::EndsWith => write!(f, "ENDS WITH"),
            Self::Contains => write!(f, "CONTAINS"),
            Self::LessThan => write!(f, "<"),
            Self::GreaterThan => write!(f, ">"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::GreaterThanOrEqual => write!(f, ">="),
        }
    }
}

/// How text operands are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextCase {
    /// Ordinal comparison
    #[default]
    Sensitive,
    /// Both sides are lowercased before comparing
    Insensitive,
}

impl FilterOperator {
    /// Whether the operator only applies to text fields
    pub fn is_text_only(self) -> bool {
        matches!(self, Self::StartsWith | Self::EndsWith | Self::Contains)
    }

    /// Whether the operator is `Equals` or `NotEquals`
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Equals | Self::NotEquals)
    }

    /// Evaluate `left <op> right`
    ///
    /// A null on either side only satisfies equality checks: `Equals` holds
    /// when both sides are null, `NotEquals` when exactly one is. Ordering
    /// and substring checks never hold against null. Text operators applied
    /// to non-text values never hold either.
    pub fn evaluate(self, left: &FieldValue, right: &FieldValue, case: TextCase) -> bool {
        if left.is_null() || right.is_null() {
            let both = left.is_null() && right.is_null();
            return match self {
                Self::Equals => both,
                Self::NotEquals => !both,
                _ => false,
            };
        }

        if let (TextCase::Insensitive, Some(l), Some(r)) = (case, left.as_text(), right.as_text()) {
            let (l, r) = (l.to_lowercase(), r.to_lowercase());
            return self.evaluate_text(&l, &r);
        }

        if let (Some(l), Some(r)) = (left.as_text(), right.as_text()) {
            return self.evaluate_text(l, r);
        }

        match self {
            Self::Equals => left == right,
            Self::NotEquals => left != right,
            Self::StartsWith | Self::EndsWith | Self::Contains => false,
            Self::LessThan => left.compare(right) == Some(Ordering::Less),
            Self::GreaterThan => left.compare(right) == Some(Ordering::Greater),
            Self::LessThanOrEqual => {
                matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal))
            }
            Self::GreaterThanOrEqual => {
                matches!(left.compare(right), Some(Ordering::Greater | Ordering::Equal))
            }
        }
    }

    fn evaluate_text(self, left: &str, right: &str) -> bool {
        match self {
            Self::Equals => left == right,
            Self::NotEquals => left != right,
            Self::StartsWith => left.starts_with(right),
            Self::EndsWith => left.ends_with(right),
            Self::Contains => left.contains(right),
            Self::LessThan => left < right,
            Self::GreaterThan => left > right,
            Self::LessThanOrEqual => left <= right,
            Self::GreaterThanOrEqual => left >= right,
        }
    }
}

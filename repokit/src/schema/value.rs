//! Field kinds and typed field values
//!
//! Every field exposed through a [`Schema`](super::Schema) reports its value
//! as a [`FieldValue`]. Literal filter values arrive as strings (structured
//! filters) or JSON scalars (serialized expressions) and are coerced into the
//! field's [`FieldKind`] before any entity is evaluated.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Declared type of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// UTF-8 text
    Text,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// Boolean
    Boolean,
    /// UTC timestamp
    Timestamp,
    /// UUID
    Uuid,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Uuid => write!(f, "uuid"),
        }
    }
}

/// A literal could not be converted to a field kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {literal:?} to {kind}: {reason}")]
pub struct CoercionError {
    /// Target kind
    pub kind: FieldKind,
    /// The offending literal, as received
    pub literal: String,
    /// Why the conversion failed
    pub reason: String,
}

impl CoercionError {
    fn new(kind: FieldKind, literal: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            kind,
            literal: literal.into(),
            reason: reason.to_string(),
        }
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value of a nullable field
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl FieldValue {
    /// Kind of a non-null value
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(FieldKind::Text),
            Self::Integer(_) => Some(FieldKind::Integer),
            Self::Float(_) => Some(FieldKind::Float),
            Self::Boolean(_) => Some(FieldKind::Boolean),
            Self::Timestamp(_) => Some(FieldKind::Timestamp),
            Self::Uuid(_) => Some(FieldKind::Uuid),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a string literal into a value of `kind`
    ///
    /// Integers and floats tolerate surrounding whitespace. Booleans accept
    /// `true`/`false` in any case. Timestamps accept RFC 3339, a naive
    /// `YYYY-MM-DDTHH:MM:SS` (read as UTC) or a bare `YYYY-MM-DD` date
    /// (midnight UTC). Text is taken verbatim.
    pub fn parse(kind: FieldKind, literal: &str) -> Result<Self, CoercionError> {
        match kind {
            FieldKind::Text => Ok(Self::Text(literal.to_string())),
            FieldKind::Integer => literal
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|e| CoercionError::new(kind, literal, e)),
            FieldKind::Float => literal
                .trim()
                .parse::<f64>()
                .map(Self::Float)
                .map_err(|e| CoercionError::new(kind, literal, e)),
            FieldKind::Boolean => {
                let trimmed = literal.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(Self::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(Self::Boolean(false))
                } else {
                    Err(CoercionError::new(kind, literal, "expected `true` or `false`"))
                }
            }
            FieldKind::Timestamp => parse_timestamp(literal.trim())
                .map(Self::Timestamp)
                .ok_or_else(|| {
                    CoercionError::new(kind, literal, "expected an RFC 3339 timestamp or a date")
                }),
            FieldKind::Uuid => Uuid::parse_str(literal.trim())
                .map(Self::Uuid)
                .map_err(|e| CoercionError::new(kind, literal, e)),
        }
    }

    /// Convert a JSON scalar into a value of `kind`
    ///
    /// JSON `null` maps to [`FieldValue::Null`]; whether null is acceptable
    /// for the target field is the caller's decision.
    pub fn from_json(kind: FieldKind, value: &serde_json::Value) -> Result<Self, CoercionError> {
        use serde_json::Value;

        let mismatch = || CoercionError::new(kind, value.to_string(), "incompatible JSON type");

        match (kind, value) {
            (_, Value::Null) => Ok(Self::Null),
            (FieldKind::Text, Value::String(s)) => Ok(Self::Text(s.clone())),
            (FieldKind::Integer, Value::Number(n)) => n.as_i64().map(Self::Integer).ok_or_else(mismatch),
            (FieldKind::Float, Value::Number(n)) => n.as_f64().map(Self::Float).ok_or_else(mismatch),
            (FieldKind::Boolean, Value::Bool(b)) => Ok(Self::Boolean(*b)),
            (FieldKind::Timestamp, Value::String(s)) | (FieldKind::Uuid, Value::String(s)) => {
                Self::parse(kind, s)
            }
            _ => Err(mismatch()),
        }
    }

    /// Render the value as a JSON scalar
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Null => Value::Null,
            Self::Text(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Float(n) => Value::from(*n),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Timestamp(t) => Value::String(t.to_rfc3339()),
            Self::Uuid(u) => Value::String(u.to_string()),
        }
    }

    /// Compare two values of the same kind
    ///
    /// Returns `None` when either side is null, the kinds differ, or a float
    /// comparison involves NaN. Text compares ordinally.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used when sorting
    ///
    /// Null sorts before every value; floats use `total_cmp`; values of
    /// different kinds fall back to a fixed kind rank.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) => 2,
            Self::Float(_) => 3,
            Self::Timestamp(_) => 4,
            Self::Uuid(_) => 5,
            Self::Text(_) => 6,
        }
    }
}

fn parse_timestamp(literal: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(literal) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(literal, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(literal, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Uuid> for FieldValue {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_integer_trims_whitespace() {
        assert_eq!(
            FieldValue::parse(FieldKind::Integer, " 42 ").unwrap(),
            FieldValue::Integer(42)
        );
    }

    #[test]
    fn test_parse_integer_rejects_text() {
        let err = FieldValue::parse(FieldKind::Integer, "forty").unwrap_err();
        assert_eq!(err.kind, FieldKind::Integer);
        assert_eq!(err.literal, "forty");
    }

    #[test]
    fn test_parse_boolean_any_case() {
        assert_eq!(
            FieldValue::parse(FieldKind::Boolean, "TRUE").unwrap(),
            FieldValue::Boolean(true)
        );
        assert!(FieldValue::parse(FieldKind::Boolean, "yes").is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let date = FieldValue::parse(FieldKind::Timestamp, "1958-10-04").unwrap();
        let rfc = FieldValue::parse(FieldKind::Timestamp, "1958-10-04T00:00:00Z").unwrap();
        let naive = FieldValue::parse(FieldKind::Timestamp, "1958-10-04T00:00:00").unwrap();
        assert_eq!(date, rfc);
        assert_eq!(date, naive);
    }

    #[test]
    fn test_parse_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(
            FieldValue::parse(FieldKind::Uuid, &id.to_string()).unwrap(),
            FieldValue::Uuid(id)
        );
    }

    #[test]
    fn test_from_json_type_mismatch() {
        assert!(FieldValue::from_json(FieldKind::Integer, &json!("12")).is_err());
        assert!(FieldValue::from_json(FieldKind::Integer, &json!(1.5)).is_err());
        assert_eq!(
            FieldValue::from_json(FieldKind::Float, &json!(2)).unwrap(),
            FieldValue::Float(2.0)
        );
        assert_eq!(
            FieldValue::from_json(FieldKind::Text, &json!(null)).unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn test_compare_requires_same_kind() {
        assert_eq!(
            FieldValue::Integer(1).compare(&FieldValue::Integer(2)),
            Some(Ordering::Less)
        );
        assert_eq!(FieldValue::Integer(1).compare(&FieldValue::Float(1.0)), None);
        assert_eq!(FieldValue::Null.compare(&FieldValue::Null), None);
    }

    #[test]
    fn test_sort_cmp_puts_null_first() {
        assert_eq!(
            FieldValue::Null.sort_cmp(&FieldValue::Integer(i64::MIN)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Float(f64::NAN).sort_cmp(&FieldValue::Float(1.0)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_option_into_value() {
        let none: Option<i64> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(FieldValue::from(Some("x")), FieldValue::Text("x".into()));
    }
}

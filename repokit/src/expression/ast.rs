//! Serializable predicate expressions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::{FilterError, FilterOperator};

/// Version written into every serialized expression
pub const EXPRESSION_FORMAT_VERSION: u64 = 1;

/// A boolean predicate over an entity's fields
///
/// Serialized as internally tagged JSON, wrapped in a versioned envelope by
/// [`Expr::to_text`]:
///
/// ```json
/// {"version": 1, "expr": {"type": "compare", "field": "population", "op": "GreaterThan", "value": 1000000}}
/// ```
///
/// Comparison values are JSON scalars; `null` is only valid against
/// nullable fields and only with `Equals`/`NotEquals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Expr {
    Const {
        value: bool,
    },
    And {
        operands: Vec<Expr>,
    },
    Or {
        operands: Vec<Expr>,
    },
    Not {
        operand: Box<Expr>,
    },
    Compare {
        field: String,
        op: FilterOperator,
        value: Value,
    },
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u64,
    expr: &'a Expr,
}

// Convenience constructors

impl Expr {
    /// Start a comparison on the named field
    ///
    /// ```rust
    /// use repokit::expression::Expr;
    ///
    /// let big = Expr::field("population").gt(1_000_000);
    /// assert_eq!(big.depth(), 1);
    /// ```
    pub fn field(name: impl Into<String>) -> FieldRef {
        FieldRef { name: name.into() }
    }

    pub fn constant(value: bool) -> Self {
        Self::Const { value }
    }

    /// `expr1 AND expr2 AND ...`
    pub fn and(operands: Vec<Expr>) -> Self {
        Self::And { operands }
    }

    /// `expr1 OR expr2 OR ...`
    pub fn or(operands: Vec<Expr>) -> Self {
        Self::Or { operands }
    }

    /// `NOT expr`
    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Expr) -> Self {
        Self::Not {
            operand: Box::new(operand),
        }
    }

    /// Nesting depth; a single comparison or constant has depth 1
    pub fn depth(&self) -> usize {
        match self {
            Self::Const { .. } | Self::Compare { .. } => 1,
            Self::And { operands } | Self::Or { operands } => {
                1 + operands.iter().map(Expr::depth).max().unwrap_or(0)
            }
            Self::Not { operand } => 1 + operand.depth(),
        }
    }

    /// Serialize into the versioned text form
    pub fn to_text(&self) -> Result<String, FilterError> {
        serde_json::to_string(&EnvelopeRef {
            version: EXPRESSION_FORMAT_VERSION,
            expr: self,
        })
        .map_err(|e| FilterError::Serialize(e.to_string()))
    }

    /// Parse the versioned text form
    ///
    /// The version is checked before the expression body is read.
    pub fn from_text(text: &str) -> Result<Self, FilterError> {
        let envelope: Value =
            serde_json::from_str(text).map_err(|e| FilterError::Deserialize(e.to_string()))?;

        let Some(object) = envelope.as_object() else {
            return Err(FilterError::Deserialize(
                "expected a JSON object envelope".to_string(),
            ));
        };

        let version = object
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| FilterError::Deserialize("missing or invalid `version`".to_string()))?;
        if version != EXPRESSION_FORMAT_VERSION {
            return Err(FilterError::UnsupportedVersion {
                found: version,
                expected: EXPRESSION_FORMAT_VERSION,
            });
        }

        let body = object
            .get("expr")
            .ok_or_else(|| FilterError::Deserialize("missing `expr`".to_string()))?;
        Expr::deserialize(body).map_err(|e| FilterError::Deserialize(e.to_string()))
    }
}

/// Field half of a comparison, see [`Expr::field`]
#[derive(Debug, Clone)]
pub struct FieldRef {
    name: String,
}

impl FieldRef {
    pub fn compare(self, op: FilterOperator, value: impl Into<Value>) -> Expr {
        Expr::Compare {
            field: self.name,
            op,
            value: value.into(),
        }
    }

    /// `field == value`
    pub fn eq(self, value: impl Into<Value>) -> Expr {
        self.compare(FilterOperator::Equals, value)
    }

    /// `field != value`
    pub fn ne(self, value: impl Into<Value>) -> Expr {
        self.compare(FilterOperator::NotEquals, value)
    }

    /// `field < value`
    pub fn lt(self, value: impl Into<Value>) -> Expr {
        self.compare(FilterOperator::LessThan, value)
    }

    /// `field <= value`
    pub fn le(self, value: impl Into<Value>) -> Expr {
        self.compare(FilterOperator::LessThanOrEqual, value)
    }

    /// `field > value`
    pub fn gt(self, value: impl Into<Value>) -> Expr {
        self.compare(FilterOperator::GreaterThan, value)
    }

    /// `field >= value`
    pub fn ge(self, value: impl Into<Value>) -> Expr {
        self.compare(FilterOperator::GreaterThanOrEqual, value)
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Expr {
        self.compare(FilterOperator::StartsWith, prefix.into())
    }

    pub fn ends_with(self, suffix: impl Into<String>) -> Expr {
        self.compare(FilterOperator::EndsWith, suffix.into())
    }

    pub fn contains(self, needle: impl Into<String>) -> Expr {
        self.compare(FilterOperator::Contains, needle.into())
    }

    pub fn is_null(self) -> Expr {
        self.compare(FilterOperator::Equals, Value::Null)
    }

    pub fn is_not_null(self) -> Expr {
        self.compare(FilterOperator::NotEquals, Value::Null)
    }
}

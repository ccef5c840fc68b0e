use std::fmt;
use std::sync::Arc;

use super::{FilterOperator, TextCase};
use crate::schema::{Entity, Field, FieldValue};

/// Caller-supplied predicate ANDed into a structured filter
pub type CustomPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// One resolved field comparison
///
/// The field is resolved against the schema and the literal converted to the
/// field's kind, so evaluation cannot fail.
pub struct Comparison<E: 'static> {
    field: &'static Field<E>,
    operator: FilterOperator,
    target: FieldValue,
    case: TextCase,
}

impl<E: 'static> Comparison<E> {
    pub(crate) fn new(
        field: &'static Field<E>,
        operator: FilterOperator,
        target: FieldValue,
        case: TextCase,
    ) -> Self {
        Self {
            field,
            operator,
            target,
            case,
        }
    }

    pub fn field_name(&self) -> &'static str {
        self.field.name()
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn target(&self) -> &FieldValue {
        &self.target
    }

    pub fn matches(&self, entity: &E) -> bool {
        self.operator
            .evaluate(&self.field.value(entity), &self.target, self.case)
    }
}

impl<E: 'static> Clone for Comparison<E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            operator: self.operator,
            target: self.target.clone(),
            case: self.case,
        }
    }
}

impl<E: 'static> fmt::Debug for Comparison<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.field.name(), self.operator, self.target)?;
        if self.case == TextCase::Insensitive {
            write!(f, " (ignore case)")?;
        }
        Ok(())
    }
}

/// Boolean predicate over an entity, compiled from either filter kind
pub enum Predicate<E: Entity> {
    Const(bool),
    And(Vec<Predicate<E>>),
    Or(Vec<Predicate<E>>),
    Not(Box<Predicate<E>>),
    Compare(Comparison<E>),
    Custom(CustomPredicate<E>),
}

impl<E: Entity> Predicate<E> {
    pub fn matches(&self, entity: &E) -> bool {
        match self {
            Self::Const(value) => *value,
            Self::And(operands) => operands.iter().all(|p| p.matches(entity)),
            Self::Or(operands) => operands.iter().any(|p| p.matches(entity)),
            Self::Not(operand) => !operand.matches(entity),
            Self::Compare(comparison) => comparison.matches(entity),
            Self::Custom(predicate) => predicate(entity),
        }
    }
}

impl<E: Entity> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Const(value) => Self::Const(*value),
            Self::And(operands) => Self::And(operands.clone()),
            Self::Or(operands) => Self::Or(operands.clone()),
            Self::Not(operand) => Self::Not(operand.clone()),
            Self::Compare(comparison) => Self::Compare(comparison.clone()),
            Self::Custom(predicate) => Self::Custom(Arc::clone(predicate)),
        }
    }
}

impl<E: Entity> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(value) => write!(f, "{}", value),
            Self::And(operands) => f.debug_tuple("And").field(operands).finish(),
            Self::Or(operands) => f.debug_tuple("Or").field(operands).finish(),
            Self::Not(operand) => f.debug_tuple("Not").field(operand).finish(),
            Self::Compare(comparison) => write!(f, "{:?}", comparison),
            Self::Custom(_) => write!(f, "<custom>"),
        }
    }
}

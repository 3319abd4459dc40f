//! Atomic checks bound into a validator chain.

use super::field::FieldType;
use thiserror::Error;

/// Reason a constraint rejected a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("min: {min}, current: {current}")]
    BelowMin { min: i64, current: i64 },

    #[error("max: {max}, current: {current}")]
    AboveMax { max: i64, current: i64 },

    #[error("{constraint} constraint cannot check a {subject} value")]
    NotApplicable {
        constraint: FieldType,
        subject: FieldType,
    },
}

/// A value that already passed the validator's type gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject<'a> {
    Str(&'a str),
    Int(i64),
    Bool(bool),
}

impl Subject<'_> {
    pub fn field_type(&self) -> FieldType {
        match self {
            Subject::Str(_) => FieldType::String,
            Subject::Int(_) => FieldType::Integer,
            Subject::Bool(_) => FieldType::Boolean,
        }
    }
}

/// One compiled restriction.
///
/// Bounds are inclusive; a missing bound is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Character count of a string.
    StringLength { min: Option<i64>, max: Option<i64> },
    /// Value of an integer.
    IntRange { min: Option<i64>, max: Option<i64> },
}

impl Constraint {
    pub fn applies_to(&self) -> FieldType {
        match self {
            Constraint::StringLength { .. } => FieldType::String,
            Constraint::IntRange { .. } => FieldType::Integer,
        }
    }

    /// Evaluates the constraint. A subject of another type is rejected with
    /// [`ConstraintViolation::NotApplicable`].
    pub fn check(&self, subject: Subject<'_>) -> Result<(), ConstraintViolation> {
        match (*self, subject) {
            (Constraint::StringLength { min, max }, Subject::Str(s)) => {
                let current = i64::try_from(s.chars().count()).unwrap_or(i64::MAX);
                check_bounds(min, max, current)
            }
            (Constraint::IntRange { min, max }, Subject::Int(current)) => {
                check_bounds(min, max, current)
            }
            (constraint, subject) => Err(ConstraintViolation::NotApplicable {
                constraint: constraint.applies_to(),
                subject: subject.field_type(),
            }),
        }
    }
}

fn check_bounds(
    min: Option<i64>,
    max: Option<i64>,
    current: i64,
) -> Result<(), ConstraintViolation> {
    if let Some(min) = min {
        if current < min {
            return Err(ConstraintViolation::BelowMin { min, current });
        }
    }
    if let Some(max) = max {
        if current > max {
            return Err(ConstraintViolation::AboveMax { max, current });
        }
    }
    Ok(())
}

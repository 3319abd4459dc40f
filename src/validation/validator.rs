//! Runtime evaluation of a compiled field rule.

use super::constraint::{Constraint, ConstraintViolation, Subject};
use super::field::FieldType;
use super::value::{ValueKind, exact_integer};
use serde_json::Value;
use thiserror::Error;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Why a field value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("not string")]
    NotString,

    #[error("not number")]
    NotNumber,

    /// A number that cannot be represented exactly as `i64`.
    #[error("not integer: {raw}")]
    NotInteger { raw: String },

    #[error("not bool")]
    NotBool,

    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),
}

impl ValidationError {
    pub fn is_type_mismatch(&self) -> bool {
        !matches!(self, ValidationError::Constraint(_))
    }
}

/// Type gate plus an ordered chain of constraints for one field.
///
/// Immutable after compilation; share it freely across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    field_type: FieldType,
    constraints: Vec<Constraint>,
}

impl Validator {
    /// A validator that only checks the type.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.push(constraint);
        self
    }

    pub(crate) fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Checks one present value.
    ///
    /// `null` passes: absence is handled by the caller, and an explicit null
    /// is not distinguished from it here. Constraints run in declaration
    /// order and the first violation is returned.
    pub fn validate(&self, value: &Value) -> ValidationResult<()> {
        let kind = ValueKind::of(value);
        if kind == ValueKind::Null {
            return Ok(());
        }

        let subject = match (self.field_type, value) {
            (FieldType::String, Value::String(s)) => Subject::Str(s),
            (FieldType::String, _) => return Err(ValidationError::NotString),
            (FieldType::Integer, Value::Number(n)) => match exact_integer(value) {
                Some(i) => Subject::Int(i),
                None => {
                    return Err(ValidationError::NotInteger { raw: n.to_string() });
                }
            },
            (FieldType::Integer, _) => return Err(ValidationError::NotNumber),
            (FieldType::Boolean, Value::Bool(b)) => Subject::Bool(*b),
            (FieldType::Boolean, _) => return Err(ValidationError::NotBool),
        };

        for constraint in &self.constraints {
            constraint.check(subject)?;
        }
        Ok(())
    }
}

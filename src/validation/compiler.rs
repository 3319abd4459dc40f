//! Compiles declared fields into validators.
//!
//! Compilation never fails as a whole. Unknown field types produce no
//! validator, unknown or malformed restrictions are logged and dropped, and
//! the remaining restrictions are still compiled.

use super::constraint::Constraint;
use super::field::{FieldSpec, FieldType};
use super::validator::Validator;
use super::value::{ValueKind, exact_integer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Restriction name understood for string fields.
pub const STRING_LENGTH: &str = "length";
/// Restriction name understood for integer fields.
pub const INTEGER_RANGE: &str = "range";

const MIN_KEY: &str = "min";
const MAX_KEY: &str = "max";

/// Why a single restriction could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("restriction '{restriction}' is not supported for {field_type} fields")]
    Unsupported {
        restriction: String,
        field_type: FieldType,
    },

    #[error("restriction '{restriction}' expects an object of parameters, got {found}")]
    NotAnObject {
        restriction: String,
        found: ValueKind,
    },

    #[error("restriction '{restriction}' parameter '{param}' is not an exact integer: {raw}")]
    NotInteger {
        restriction: String,
        param: &'static str,
        raw: String,
    },
}

/// Builds the validator for one field.
///
/// Returns `None` when the declared type tag is unknown, in which case the
/// field is accepted unchecked.
pub fn compile(field: &FieldSpec) -> Option<Validator> {
    let Some(field_type) = field.field_type() else {
        warn!(
            field = %field.name,
            type_tag = field.type_tag,
            "field type is not supported, values pass unchecked"
        );
        return None;
    };

    let mut validator = Validator::new(field_type);

    if field_type == FieldType::Boolean {
        if !field.restrictions.is_empty() {
            debug!(field = %field.name, "boolean fields take no restrictions, ignoring");
        }
        return Some(validator);
    }

    for (name, params) in &field.restrictions {
        match compile_restriction(field_type, name, params) {
            Ok(Some(constraint)) => validator.push(constraint),
            Ok(None) => {
                warn!(
                    field = %field.name,
                    restriction = %name,
                    "restriction has neither min nor max, nothing to check"
                );
            }
            Err(error) => {
                warn!(field = %field.name, %error, "dropping restriction");
            }
        }
    }

    debug!(
        field = %field.name,
        field_type = %field_type,
        constraints = validator.constraints().len(),
        "compiled field validator"
    );
    Some(validator)
}

/// Compiles one named restriction for a field type.
///
/// `Ok(None)` means the restriction is well-formed but bounds nothing.
pub fn compile_restriction(
    field_type: FieldType,
    name: &str,
    params: &Value,
) -> Result<Option<Constraint>, CompileError> {
    match (field_type, name) {
        (FieldType::String, STRING_LENGTH) => Ok(parse_bounds(name, params)?
            .map(|(min, max)| Constraint::StringLength { min, max })),
        (FieldType::Integer, INTEGER_RANGE) => Ok(parse_bounds(name, params)?
            .map(|(min, max)| Constraint::IntRange { min, max })),
        _ => Err(CompileError::Unsupported {
            restriction: name.to_string(),
            field_type,
        }),
    }
}

type Bounds = (Option<i64>, Option<i64>);

fn parse_bounds(restriction: &str, params: &Value) -> Result<Option<Bounds>, CompileError> {
    let params = match params {
        Value::Null => return Ok(None),
        Value::Object(map) => map,
        other => {
            return Err(CompileError::NotAnObject {
                restriction: restriction.to_string(),
                found: ValueKind::of(other),
            });
        }
    };

    let min = bound(restriction, params, MIN_KEY)?;
    let max = bound(restriction, params, MAX_KEY)?;

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            warn!(restriction, min, max, "min exceeds max, every value will be rejected");
        }
    }

    if min.is_none() && max.is_none() {
        Ok(None)
    } else {
        Ok(Some((min, max)))
    }
}

fn bound(
    restriction: &str,
    params: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<i64>, CompileError> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => exact_integer(value)
            .map(Some)
            .ok_or_else(|| CompileError::NotInteger {
                restriction: restriction.to_string(),
                param: key,
                raw: value.to_string(),
            }),
    }
}

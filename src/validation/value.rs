//! Classification of decoded JSON values.
//!
//! Request bodies and restriction parameters are decoded into
//! [`serde_json::Value`]. Numbers keep their textual integer/float
//! distinction, so integers can be extracted exactly without ever passing
//! through `f64`.

use serde_json::Value;
use std::fmt;

/// Dynamic type of a decoded JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    /// A number that fits exactly into `i64`.
    Integer,
    /// Any other number: fractional, exponent form or outside `i64`.
    Float,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) if n.is_i64() => ValueKind::Integer,
            Value::Number(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_number(self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Returns the value as `i64` only when the decoded number is an exact integer.
///
/// `10`, `-3` and `9223372036854775807` succeed; `10.0`, `1e3`, `2.5` and
/// numbers beyond the `i64` range do not.
pub fn exact_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_every_variant() {
        assert_eq!(ValueKind::of(&json!(null)), ValueKind::Null);
        assert_eq!(ValueKind::of(&json!(true)), ValueKind::Bool);
        assert_eq!(ValueKind::of(&json!(42)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(4.2)), ValueKind::Float);
        assert_eq!(ValueKind::of(&json!("x")), ValueKind::String);
        assert_eq!(ValueKind::of(&json!([1])), ValueKind::Array);
        assert_eq!(ValueKind::of(&json!({"a": 1})), ValueKind::Object);
    }

    #[test]
    fn exact_integer_rejects_lossy_numbers() {
        let parse = |s: &str| serde_json::from_str::<Value>(s).unwrap();

        assert_eq!(exact_integer(&parse("9223372036854775807")), Some(i64::MAX));
        assert_eq!(exact_integer(&parse("-12")), Some(-12));
        assert_eq!(exact_integer(&parse("10.0")), None);
        assert_eq!(exact_integer(&parse("1e3")), None);
        assert_eq!(exact_integer(&parse("18446744073709551615")), None);
        assert_eq!(exact_integer(&parse("\"5\"")), None);
    }

    #[test]
    fn unsigned_beyond_i64_is_not_an_integer_kind() {
        let v: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(ValueKind::of(&v), ValueKind::Float);
        assert!(ValueKind::of(&v).is_number());
    }
}

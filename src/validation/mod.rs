//! Field validation compiled from declarative configuration.
//!
//! A [`FieldSpec`] names a field, its scalar type and a set of restrictions.
//! [`compile`] turns it into a [`Validator`]: a type gate followed by an
//! ordered chain of [`Constraint`]s, evaluated against decoded JSON values.
//!
//! # Usage
//!
//! ```rust
//! use fieldgate::validation::{FieldSpec, FieldType, compile};
//! use serde_json::json;
//!
//! let field = FieldSpec::new("name", FieldType::String)
//!     .with_restriction("length", json!({"min": 2, "max": 5}));
//! let validator = compile(&field).expect("string is a supported type");
//!
//! assert!(validator.validate(&json!("abc")).is_ok());
//! assert_eq!(
//!     validator.validate(&json!("a")).unwrap_err().to_string(),
//!     "min: 2, current: 1"
//! );
//! ```

pub mod compiler;
pub mod constraint;
pub mod field;
pub mod validator;
pub mod value;

pub use compiler::{CompileError, INTEGER_RANGE, STRING_LENGTH, compile, compile_restriction};
pub use constraint::{Constraint, ConstraintViolation, Subject};
pub use field::{FieldSpec, FieldType};
pub use validator::{ValidationError, ValidationResult, Validator};
pub use value::{ValueKind, exact_integer};

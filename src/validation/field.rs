//! Declared request fields.

use serde_json::{Map, Value};
use std::fmt;

/// Scalar type a field is declared with.
///
/// Configuration refers to types by numeric tag: `1` integer, `2` string,
/// `3` boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    String,
    Boolean,
}

impl FieldType {
    pub const INTEGER_TAG: i64 = 1;
    pub const STRING_TAG: i64 = 2;
    pub const BOOLEAN_TAG: i64 = 3;

    /// Maps a configuration tag to a type; unknown tags yield `None`.
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            Self::INTEGER_TAG => Some(FieldType::Integer),
            Self::STRING_TAG => Some(FieldType::String),
            Self::BOOLEAN_TAG => Some(FieldType::Boolean),
            _ => None,
        }
    }

    pub fn tag(self) -> i64 {
        match self {
            FieldType::Integer => Self::INTEGER_TAG,
            FieldType::String => Self::STRING_TAG,
            FieldType::Boolean => Self::BOOLEAN_TAG,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Integer => write!(f, "integer"),
            FieldType::String => write!(f, "string"),
            FieldType::Boolean => write!(f, "boolean"),
        }
    }
}

/// One declared field of an endpoint, as read from configuration.
///
/// `type_tag` is kept raw so an unsupported tag can be reported and the field
/// still served (unchecked) instead of failing the whole configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub type_tag: i64,
    /// Restriction name to parameters, in declaration order.
    pub restrictions: Map<String, Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            type_tag: field_type.tag(),
            restrictions: Map::new(),
        }
    }

    pub fn with_restriction(mut self, name: impl Into<String>, params: Value) -> Self {
        self.restrictions.insert(name.into(), params);
        self
    }

    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_tag(self.type_tag)
    }
}

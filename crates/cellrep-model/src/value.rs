//! Field types and dynamically typed field values.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
        }
    }

    /// Integer and float fields can be ranked and summed.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" | "str" => Ok(FieldType::Text),
            "integer" | "int" | "i64" => Ok(FieldType::Integer),
            "float" | "double" | "f64" => Ok(FieldType::Float),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            _ => Err(format!("Unknown field type: {}", s)),
        }
    }
}

/// One cell of a record.
///
/// `Missing` is valid for every field type and stands for an absent value
/// in the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Missing,
}

impl FieldValue {
    /// The type carried by this value, `None` for `Missing`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FieldValue::Text(_) => Some(FieldType::Text),
            FieldValue::Integer(_) => Some(FieldType::Integer),
            FieldValue::Float(_) => Some(FieldType::Float),
            FieldValue::Boolean(_) => Some(FieldType::Boolean),
            FieldValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Whether this value may be stored in a field declared as `field_type`.
    pub fn conforms_to(&self, field_type: FieldType) -> bool {
        self.field_type().is_none_or(|own| own == field_type)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Key used when picking the maximal record of a group. NaN never ranks.
    pub fn rank_key(&self) -> Option<RankKey> {
        match self {
            FieldValue::Integer(value) => Some(RankKey::Integer(*value)),
            FieldValue::Float(value) if !value.is_nan() => Some(RankKey::Float(*value)),
            _ => None,
        }
    }
}

/// Comparable rank value. Integers compare exactly as `i64`; only a mix of
/// integer and float keys falls back to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankKey {
    Integer(i64),
    Float(f64),
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (RankKey::Integer(a), RankKey::Integer(b)) => Some(a.cmp(b)),
            (RankKey::Float(a), RankKey::Float(b)) => a.partial_cmp(b),
            (RankKey::Integer(a), RankKey::Float(b)) => (*a as f64).partial_cmp(b),
            (RankKey::Float(a), RankKey::Integer(b)) => a.partial_cmp(&(*b as f64)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(value) => f.write_str(value),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Boolean(value) => write!(f, "{value}"),
            FieldValue::Missing => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Missing, Into::into)
    }
}

/// A Rust scalar that a field can be projected into.
pub trait FieldScalar: Sized {
    /// The field type this scalar is read from.
    const FIELD_TYPE: FieldType;

    /// Whether fields of `field_type` can be projected into this scalar.
    fn accepts(field_type: FieldType) -> bool {
        field_type == Self::FIELD_TYPE
    }

    fn from_value(value: &FieldValue) -> Option<Self>;
}

impl FieldScalar for bool {
    const FIELD_TYPE: FieldType = FieldType::Boolean;

    fn from_value(value: &FieldValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldScalar for i64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn from_value(value: &FieldValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FieldScalar for f64 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    // Integer columns widen to float.
    fn accepts(field_type: FieldType) -> bool {
        field_type.is_numeric()
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FieldScalar for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn from_value(value: &FieldValue) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}

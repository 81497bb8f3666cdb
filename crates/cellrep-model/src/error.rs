//! Error types for the record model.

use std::fmt;

use thiserror::Error;

use crate::value::FieldType;

/// A request that does not fit the record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The field is not declared in the schema.
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    /// A record lacks a field the schema declares.
    #[error("record for {barcode} is missing field '{field}'")]
    MissingField { barcode: String, field: String },

    /// A record carries a field the schema does not declare.
    #[error("record for {barcode} has unexpected field '{field}'")]
    UnexpectedField { barcode: String, field: String },

    /// A value or a typed request disagrees with the declared field type.
    #[error("field '{field}' is {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },

    /// Ranking needs an integer or float field.
    #[error("field '{field}' of type {found} cannot be ranked")]
    NotRankable { field: String, found: FieldType },
}

/// Errors raised by collection construction and transformation.
///
/// All of these are caller-side contract violations; none are transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Outer or inner lengths disagree between two aligned structures.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    /// The primary index names the same entity twice.
    #[error("duplicate key '{key}' at positions {first} and {second}")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },

    #[error("duplicate field '{0}' in schema")]
    DuplicateField(String),

    #[error("invalid barcode: '{0}'")]
    InvalidBarcode(String),

    #[error("invalid field name: '{0}'")]
    InvalidFieldName(String),

    #[error("position {position} out of range for length {len}")]
    PositionOutOfRange { position: usize, len: usize },
}

impl ModelError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        Self::ShapeMismatch {
            context,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Returns true for [`ModelError::ShapeMismatch`].
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }

    /// Returns true for any [`ModelError::Schema`] error.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

//! Error types for cell tables and the repertoire pipeline.

use cellrep_model::ModelError;
use thiserror::Error;

/// Errors raised while assembling or transforming a cell table.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A ragged-model operation failed (shape, schema or key errors).
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    /// No collection is attached under this name.
    #[error("no collection named '{name}' is attached")]
    UnknownCollection { name: String },

    /// The contig table lacks a field the pipeline needs.
    #[error("contig table has no field '{field}'")]
    MissingField { field: String },
}

impl From<polars::prelude::PolarsError> for CoreError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

impl CoreError {
    /// Whether the underlying failure is a shape mismatch.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, CoreError::Model(err) if err.is_shape_mismatch())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::UnknownCollection {
            name: "IGH".to_string(),
        };
        assert_eq!(err.to_string(), "no collection named 'IGH' is attached");
    }

    #[test]
    fn test_error_from_polars() {
        let polars_err = polars::prelude::PolarsError::ColumnNotFound("TRA_cdr3".into());
        let core_err: CoreError = polars_err.into();
        assert!(matches!(core_err, CoreError::DataFrame { .. }));
    }
}

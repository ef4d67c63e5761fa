//! Error types for tensor types and tensor values

use thiserror::Error;

use crate::tensor::Aggregator;
use crate::types::TensorType;

/// Errors raised by the tensor type system and the tensor algebra.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TensorError {
    /// The operand types of an operator are incompatible.
    #[error("{operation}: incompatible type {}: {detail}", describe_operands(.left, .right))]
    TypeMismatch {
        operation: &'static str,
        left: TensorType,
        right: Option<TensorType>,
        detail: String,
    },

    /// A tensor type specification could not be understood.
    #[error("Invalid tensor type '{spec}': {reason}")]
    InvalidType { spec: String, reason: String },

    /// A cell address does not fit the tensor type.
    #[error("Invalid address for {tensor_type}: {reason}")]
    InvalidAddress {
        tensor_type: TensorType,
        reason: String,
    },

    /// The same address was given more than once to a builder.
    #[error("Duplicate cell address {address} in {tensor_type}")]
    DuplicateAddress {
        tensor_type: TensorType,
        address: String,
    },

    /// An aggregator without an identity element was applied to no cells.
    #[error("Cannot {aggregator} an empty set of cells")]
    EmptyAggregation { aggregator: Aggregator },

    /// A scalar was required.
    #[error("Require a dimensionless tensor but has {0}")]
    NotScalar(TensorType),

    /// A tensor literal could not be parsed.
    #[error("Invalid tensor literal at position {position}: {message}")]
    Parse { position: usize, message: String },
}

fn describe_operands(left: &TensorType, right: &Option<TensorType>) -> String {
    match right {
        Some(right) => format!("{} and {}", left, right),
        None => left.to_string(),
    }
}

impl TensorError {
    pub(crate) fn mismatch(
        operation: &'static str,
        left: &TensorType,
        right: &TensorType,
        detail: impl Into<String>,
    ) -> Self {
        TensorError::TypeMismatch {
            operation,
            left: left.clone(),
            right: Some(right.clone()),
            detail: detail.into(),
        }
    }

    pub(crate) fn unary_mismatch(
        operation: &'static str,
        operand: &TensorType,
        detail: impl Into<String>,
    ) -> Self {
        TensorError::TypeMismatch {
            operation,
            left: operand.clone(),
            right: None,
            detail: detail.into(),
        }
    }
}

/// Result type alias for tensor operations
pub type Result<T> = std::result::Result<T, TensorError>;

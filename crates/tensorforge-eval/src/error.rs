//! Error types for model loading and function evaluation.

use tensorforge_core::{TensorError, TensorType};
use tensorforge_expr::{ParseError, ReferenceKind, ResolveError};
use thiserror::Error;

/// A model could not be built, or a function could not be found in it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid expression for function '{function}': {source}")]
    Parse {
        function: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Function '{function}' is defined twice in model '{model}'")]
    DuplicateFunction { model: String, function: String },

    #[error("Argument '{argument}' is declared twice by function '{function}'")]
    DuplicateArgument { function: String, argument: String },

    #[error("Default of argument '{argument}' in function '{function}' has type {actual}, declared {declared}")]
    InvalidDefault {
        function: String,
        argument: String,
        declared: TensorType,
        actual: TensorType,
    },

    #[error("Model '{model}' has several functions, name one of: {}", .functions.join(", "))]
    AmbiguousFunction {
        model: String,
        functions: Vec<String>,
    },

    #[error("No function '{function}' in model '{model}'")]
    UnknownFunction { model: String, function: String },

    #[error("No model '{0}'")]
    UnknownModel(String),

    #[error("Model '{0}' is registered twice")]
    DuplicateModel(String),
}

/// Binding or evaluating a function failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Function '{function}' has no argument '{argument}'")]
    UnknownArgument { function: String, argument: String },

    #[error("Argument '{argument}' of function '{function}' must be {expected}, got {actual}")]
    ArgumentTypeMismatch {
        function: String,
        argument: String,
        expected: TensorType,
        actual: TensorType,
    },

    #[error("Function '{function}' has unbound arguments: {}", .arguments.join(", "))]
    UnboundArgument {
        function: String,
        arguments: Vec<String>,
    },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// A reference that type resolution accepted has no value.
    #[error("No value for {kind} '{name}'")]
    MissingReference { kind: ReferenceKind, name: String },

    #[error("Optimized evaluation of '{function}' gave {optimized}, interpretation gave {generic}")]
    OptimizationMismatch {
        function: String,
        optimized: f64,
        generic: f64,
    },
}

/// Result type alias for evaluation
pub type Result<T> = std::result::Result<T, EvaluationError>;

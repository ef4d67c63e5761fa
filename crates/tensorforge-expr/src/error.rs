//! Error types for parsing and type resolution.

use std::fmt;

use tensorforge_core::TensorError;
use thiserror::Error;

/// An expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid expression at position {position}: {message}")]
pub struct ParseError {
    /// Byte offset into the expression text.
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// The kind of name a reference denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Argument,
    Constant,
    Function,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceKind::Argument => "argument",
            ReferenceKind::Constant => "constant",
            ReferenceKind::Function => "function",
        })
    }
}

/// Type resolution of a set of functions failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// Functions invoke each other in a cycle; the chain starts and ends
    /// with the same function.
    #[error("Cyclic function definition: {}", .chain.join(" -> "))]
    CyclicDefinition { chain: Vec<String> },

    #[error("Unbound {kind} '{name}' referenced in function '{function}'")]
    UnboundReference {
        kind: ReferenceKind,
        name: String,
        function: String,
    },

    #[error("Invalid invocation of '{callee}' in function '{function}': {reason}")]
    InvalidInvocation {
        function: String,
        callee: String,
        reason: String,
    },

    #[error("Invalid lambda in function '{function}': {reason}")]
    InvalidLambda { function: String, reason: String },

    #[error("Type error in function '{function}': {source}")]
    Type {
        function: String,
        #[source]
        source: TensorError,
    },
}

/// Result type alias for type resolution
pub type Result<T> = std::result::Result<T, ResolveError>;

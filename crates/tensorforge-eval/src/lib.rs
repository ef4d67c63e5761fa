//! TensorForge Eval - models and function evaluation
//!
//! - [`ModelBuilder`] links and type-checks the functions of a model
//! - [`Model`] and [`ModelRegistry`] hold resolved functions and constants
//! - [`FunctionEvaluator`] binds arguments and evaluates one function,
//!   memoizing auxiliary functions
//!
//! Functions that are sums of condition trees are evaluated through a
//! compacted branch table ([`CompactForest`]), optionally compiled to
//! native code.

pub mod context;
pub mod error;
pub mod evaluator;
pub mod function;
pub mod gbdt;
mod interpret;
pub mod jit;
pub mod model;
pub mod registry;

#[cfg(test)]
mod tests;

pub use context::Context;
pub use error::{EvaluationError, ModelError, Result};
pub use evaluator::FunctionEvaluator;
pub use function::{ArgumentDef, Function, FunctionDef};
pub use gbdt::{CompactForest, OptimizedForest};
pub use jit::{JitError, NativeForest};
pub use model::{Model, ModelBuilder};
pub use registry::ModelRegistry;

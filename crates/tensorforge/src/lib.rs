//! TensorForge - Tensor Expression Models in Rust
//!
//! Define functions over tensors in a small expression language, group them
//! into models with shared constants, and evaluate them with bound
//! arguments.
//!
//! # Example
//!
//! ```rust
//! use tensorforge::prelude::*;
//!
//! let model = Model::builder("linear")
//!     .with_constant("w", Tensor::from_literal("tensor(x[2]):[0.5,2.0]").unwrap())
//!     .with_function(
//!         FunctionDef::parse("score", "reduce(input * constant(w), sum) + 1")
//!             .unwrap()
//!             .with_argument("input", TensorType::from_spec("tensor(x[2])").unwrap()),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut evaluator = model.evaluator().unwrap();
//! evaluator
//!     .bind("input", Tensor::from_literal("tensor(x[2]):[4.0,1.0]").unwrap())
//!     .unwrap();
//! assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 5.0);
//! ```

// Tensor values and types
pub use tensorforge_core::{
    Aggregator, Dimension, Label, Tensor, TensorAddress, TensorError, TensorType,
};

// Expressions
pub use tensorforge_expr::{BinaryOp, Expr, Lambda, ParseError, ResolveError, UnaryFunction};

// Models and evaluation
pub use tensorforge_eval::{
    ArgumentDef, EvaluationError, Function, FunctionDef, FunctionEvaluator, Model, ModelBuilder,
    ModelError, ModelRegistry,
};

// Configuration
pub use tensorforge_config::{ConfigError, EvaluationConfig, ForestBackend, OptimizationConfig};

/// Colored console logging.
#[cfg(feature = "console")]
pub use tensorforge_console as console;

/// Building blocks below the model layer.
pub mod advanced {
    pub use tensorforge_core::{Cells, TensorBuilder, TensorTypeBuilder};
    pub use tensorforge_eval::{CompactForest, Context, NativeForest, OptimizedForest};
    pub use tensorforge_expr::{Declaration, TypeResolver};
}

pub mod prelude {
    pub use super::{
        Aggregator, EvaluationConfig, Expr, FunctionDef, Model, ModelRegistry,
        OptimizationConfig, Tensor, TensorType,
    };
}

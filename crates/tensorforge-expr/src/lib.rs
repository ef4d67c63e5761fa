//! TensorForge Expr - tensor expressions
//!
//! Expression trees over tensors, the textual expression language (parser
//! and printer), the scalar lambdas carried by join and map, and static type
//! resolution across the functions of a model.

mod display;
pub mod error;
pub mod expr;
pub mod lambda;
pub mod ops;
mod parse;
pub mod resolve;

pub use error::{ParseError, ReferenceKind, ResolveError};
pub use expr::Expr;
pub use lambda::{Lambda, NativeLambda, ScalarLambda};
pub use ops::{BinaryOp, UnaryFunction};
pub use resolve::{Declaration, TypeResolver};

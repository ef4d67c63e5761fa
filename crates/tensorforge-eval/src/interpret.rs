//! Tree-walking evaluation of expressions.
//!
//! This is the reference semantics; the optimized forest path must agree
//! with it.

use std::collections::HashMap;
use std::sync::Arc;

use tensorforge_core::Tensor;
use tensorforge_expr::{Expr, ReferenceKind};

use crate::error::{EvaluationError, Result};
use crate::function::Function;
use crate::model::Model;

/// Argument bindings visible to one function body.
pub(crate) struct Frame<'f> {
    bindings: &'f HashMap<String, Arc<Tensor>>,
    /// Whether these are the evaluator's own bindings, so that results of
    /// functions inheriting them can be memoized.
    memoize: bool,
}

impl<'f> Frame<'f> {
    pub(crate) fn root(bindings: &'f HashMap<String, Arc<Tensor>>) -> Self {
        Self {
            bindings,
            memoize: true,
        }
    }
}

pub(crate) struct Interpreter<'m, 'c> {
    model: &'m Model,
    memo: &'c mut HashMap<String, Arc<Tensor>>,
}

impl<'m, 'c> Interpreter<'m, 'c> {
    pub(crate) fn new(model: &'m Model, memo: &'c mut HashMap<String, Arc<Tensor>>) -> Self {
        Self { model, memo }
    }

    /// Evaluates a function body, through its optimized form when it has
    /// one and every feature is bound to a scalar.
    pub(crate) fn eval_function(&mut self, function: &Function, frame: &Frame<'_>) -> Result<Arc<Tensor>> {
        let model = self.model;
        let config = model.optimization();
        let Some(forest) = function.optimized(config) else {
            return self.eval(function.expression(), frame);
        };
        let Some(features) = forest.features_from(frame.bindings) else {
            return self.eval(function.expression(), frame);
        };

        let optimized = forest.evaluate(&features);
        if config.verify_optimized {
            let generic = self.eval(function.expression(), frame)?.as_double()?;
            let same = optimized == generic || (optimized.is_nan() && generic.is_nan());
            if !same {
                return Err(EvaluationError::OptimizationMismatch {
                    function: function.name().to_string(),
                    optimized,
                    generic,
                });
            }
        }
        Ok(Arc::new(Tensor::scalar(optimized)))
    }

    pub(crate) fn eval(&mut self, expr: &Expr, frame: &Frame<'_>) -> Result<Arc<Tensor>> {
        let value = match expr {
            Expr::Number(value) => Tensor::scalar(*value),
            Expr::Constant(name) => {
                return self.model.constant(name).cloned().ok_or_else(|| {
                    EvaluationError::MissingReference {
                        kind: ReferenceKind::Constant,
                        name: name.clone(),
                    }
                })
            }
            Expr::Argument(name) => {
                return frame.bindings.get(name).cloned().ok_or_else(|| {
                    EvaluationError::MissingReference {
                        kind: ReferenceKind::Argument,
                        name: name.clone(),
                    }
                })
            }
            Expr::Invoke {
                function,
                arguments,
            } => return self.invoke(function, arguments, frame),
            Expr::Unary { function, arg } => {
                let function = *function;
                self.eval(arg, frame)?.map(|a| function.apply(a))
            }
            Expr::Binary { .. } => {
                // Folded left to right, the order the forest sums its trees in.
                let (first, links) = expr.binary_chain();
                let mut value = self.eval(first, frame)?;
                for (op, right) in links {
                    let right = self.eval(right, frame)?;
                    value = Arc::new(value.join(&right, |a, b| op.apply(a, b))?);
                }
                return Ok(value);
            }
            Expr::If {
                condition,
                then_expr,
                else_expr,
            } => {
                let branch = if self.eval(condition, frame)?.as_double()? != 0.0 {
                    then_expr
                } else {
                    else_expr
                };
                return self.eval(branch, frame);
            }
            Expr::In { value, set } => self
                .eval(value, frame)?
                .map(|v| if set.contains(&v) { 1.0 } else { 0.0 }),
            Expr::Join {
                left,
                right,
                lambda,
            } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                left.join(&right, |a, b| lambda.apply2(a, b))?
            }
            Expr::Reduce {
                arg,
                aggregator,
                dimensions,
            } => self.eval(arg, frame)?.reduce(*aggregator, dimensions)?,
            Expr::Rename { arg, from, to } => self.eval(arg, frame)?.rename(from, to)?,
            Expr::Map { arg, lambda } => self.eval(arg, frame)?.map(|a| lambda.apply1(a)),
            Expr::Concat {
                left,
                right,
                dimension,
            } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                left.concat(&right, dimension)?
            }
            Expr::Create { tensor_type, cells } => {
                let mut builder = Tensor::builder(tensor_type.clone());
                for (address, cell) in cells {
                    let value = self.eval(cell, frame)?.as_double()?;
                    builder.cell(value, address.clone());
                }
                builder.build()?
            }
        };
        Ok(Arc::new(value))
    }

    fn invoke(&mut self, name: &str, arguments: &[Expr], frame: &Frame<'_>) -> Result<Arc<Tensor>> {
        let model = self.model;
        let function = model
            .function(name)
            .ok_or_else(|| EvaluationError::MissingReference {
                kind: ReferenceKind::Function,
                name: name.to_string(),
            })?;

        if arguments.is_empty() {
            if frame.memoize {
                if let Some(result) = self.memo.get(name) {
                    return Ok(Arc::clone(result));
                }
            }
            let result = self.eval_function(function, frame)?;
            if frame.memoize {
                self.memo.insert(name.to_string(), Arc::clone(&result));
            }
            return Ok(result);
        }

        let mut bindings = HashMap::with_capacity(arguments.len());
        for (argument, declared) in arguments.iter().zip(function.arguments()) {
            bindings.insert(declared.name().to_string(), self.eval(argument, frame)?);
        }
        let callee_frame = Frame {
            bindings: &bindings,
            memoize: false,
        };
        self.eval_function(function, &callee_frame)
    }
}

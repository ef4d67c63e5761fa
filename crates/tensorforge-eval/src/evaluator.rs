//! Binding arguments and evaluating one function of a model.

use std::sync::Arc;

use tensorforge_core::Tensor;
use tracing::trace;

use crate::context::Context;
use crate::error::{EvaluationError, Result};
use crate::function::Function;
use crate::interpret::{Frame, Interpreter};
use crate::model::Model;

/// Evaluates one function of a model.
///
/// Owned by a single caller. Arguments with defaults start out bound to
/// them; [`bind`](Self::bind) replaces a binding and invalidates every
/// cached result.
#[derive(Debug)]
pub struct FunctionEvaluator<'m> {
    model: &'m Model,
    function: &'m Function,
    context: Context<'m>,
    result: Option<Arc<Tensor>>,
}

impl<'m> FunctionEvaluator<'m> {
    pub(crate) fn new(model: &'m Model, function: &'m Function) -> Self {
        let mut context = Context::new(model.constants());
        for argument in function.arguments() {
            if let Some(default) = argument.default() {
                context.bind(argument.name().to_string(), Arc::clone(default));
            }
        }
        Self {
            model,
            function,
            context,
            result: None,
        }
    }

    pub fn function(&self) -> &'m Function {
        self.function
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn context(&self) -> &Context<'m> {
        &self.context
    }

    /// Binds a declared argument. The value must be assignable to the
    /// declared type.
    pub fn bind(&mut self, name: &str, value: impl Into<Arc<Tensor>>) -> Result<&mut Self> {
        let value = value.into();
        let Some(argument) = self.function.argument(name) else {
            return Err(EvaluationError::UnknownArgument {
                function: self.function.name().to_string(),
                argument: name.to_string(),
            });
        };
        if !value.is_assignable_to(argument.tensor_type()) {
            return Err(EvaluationError::ArgumentTypeMismatch {
                function: self.function.name().to_string(),
                argument: name.to_string(),
                expected: argument.tensor_type().clone(),
                actual: value.tensor_type().clone(),
            });
        }
        self.context.bind(name.to_string(), value);
        self.result = None;
        Ok(self)
    }

    pub fn bind_double(&mut self, name: &str, value: f64) -> Result<&mut Self> {
        self.bind(name, Tensor::scalar(value))
    }

    /// Evaluates the function with the current bindings.
    ///
    /// Calling this again without binding anything new returns the same
    /// `Arc`.
    pub fn evaluate(&mut self) -> Result<Arc<Tensor>> {
        if let Some(result) = &self.result {
            return Ok(Arc::clone(result));
        }

        let missing: Vec<String> = self
            .function
            .arguments()
            .iter()
            .filter(|a| !self.context.is_bound(a.name()))
            .map(|a| a.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EvaluationError::UnboundArgument {
                function: self.function.name().to_string(),
                arguments: missing,
            });
        }

        let (bindings, memo) = self.context.split();
        let result = Interpreter::new(self.model, memo)
            .eval_function(self.function, &Frame::root(bindings))?;
        trace!(
            event = "evaluate",
            function = %self.function.name(),
            result_type = %result.tensor_type(),
        );
        self.result = Some(Arc::clone(&result));
        Ok(result)
    }
}

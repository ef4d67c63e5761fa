//! Static type resolution across the functions of a model.
//!
//! Each function body is typed bottom-up in one pass. Invocations are
//! followed depth-first through the invocation graph; results are memoized
//! and a function found on the active path is a cycle.

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use tensorforge_core::{TensorError, TensorType};
use tracing::debug;

use crate::error::{ReferenceKind, ResolveError, Result};
use crate::expr::Expr;
use crate::lambda::Lambda;

/// A function as seen by the resolver: its declared arguments and body.
#[derive(Debug, Clone)]
pub struct Declaration<'a> {
    pub name: &'a str,
    pub arguments: Vec<(&'a str, &'a TensorType)>,
    pub body: &'a Expr,
}

impl<'a> Declaration<'a> {
    pub fn new(name: &'a str, body: &'a Expr) -> Self {
        Self {
            name,
            arguments: Vec::new(),
            body,
        }
    }

    pub fn with_argument(mut self, name: &'a str, tensor_type: &'a TensorType) -> Self {
        self.arguments.push((name, tensor_type));
        self
    }

    fn argument(&self, name: &str) -> Option<&'a TensorType> {
        self.arguments
            .iter()
            .find(|(argument, _)| *argument == name)
            .map(|(_, t)| *t)
    }
}

/// Resolves the return types of a set of functions.
///
/// ```
/// use tensorforge_core::TensorType;
/// use tensorforge_expr::{Declaration, Expr, TypeResolver};
///
/// let x = TensorType::from_spec("tensor(d0[3])").unwrap();
/// let body = Expr::parse("reduce(x, sum)").unwrap();
///
/// let mut resolver = TypeResolver::new();
/// resolver.function(Declaration::new("total", &body).with_argument("x", &x));
/// assert!(resolver.resolve("total").unwrap().is_scalar());
/// ```
#[derive(Debug, Default)]
pub struct TypeResolver<'a> {
    order: Vec<&'a str>,
    functions: HashMap<&'a str, Declaration<'a>>,
    constants: HashMap<&'a str, &'a TensorType>,
    resolved: HashMap<&'a str, TensorType>,
    active: Vec<&'a str>,
}

impl<'a> TypeResolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(&mut self, name: &'a str, tensor_type: &'a TensorType) -> &mut Self {
        self.constants.insert(name, tensor_type);
        self
    }

    pub fn function(&mut self, declaration: Declaration<'a>) -> &mut Self {
        if self.functions.insert(declaration.name, declaration.clone()).is_none() {
            self.order.push(declaration.name);
        }
        self
    }

    /// The return type of `name`, resolving every function it invokes.
    pub fn resolve(&mut self, name: &str) -> Result<TensorType> {
        let declaration = match self.functions.get(name) {
            Some(declaration) => declaration.clone(),
            None => {
                return Err(ResolveError::UnboundReference {
                    kind: ReferenceKind::Function,
                    name: name.to_string(),
                    function: self
                        .active
                        .last()
                        .map_or_else(|| name.to_string(), |f| f.to_string()),
                })
            }
        };
        if let Some(resolved) = self.resolved.get(name) {
            return Ok(resolved.clone());
        }
        if let Some(start) = self.active.iter().position(|f| *f == name) {
            let mut chain: Vec<String> = self.active[start..].iter().map(|f| f.to_string()).collect();
            chain.push(name.to_string());
            return Err(ResolveError::CyclicDefinition { chain });
        }

        self.active.push(declaration.name);
        let result = self.type_of(declaration.body, &declaration);
        self.active.pop();
        let tensor_type = result?;

        debug!(
            event = "function_resolved",
            function = declaration.name,
            tensor_type = %tensor_type,
        );
        self.resolved.insert(declaration.name, tensor_type.clone());
        Ok(tensor_type)
    }

    /// Resolves every function, in declaration order.
    pub fn resolve_all(&mut self) -> Result<HashMap<String, TensorType>> {
        let mut types = HashMap::with_capacity(self.order.len());
        for name in self.order.clone() {
            types.insert(name.to_string(), self.resolve(name)?);
        }
        Ok(types)
    }

    fn type_of(&mut self, expr: &'a Expr, function: &Declaration<'a>) -> Result<TensorType> {
        let typed = |source: TensorError| ResolveError::Type {
            function: function.name.to_string(),
            source,
        };
        let unbound = |kind: ReferenceKind, name: &str| ResolveError::UnboundReference {
            kind,
            name: name.to_string(),
            function: function.name.to_string(),
        };

        match expr {
            Expr::Number(_) => Ok(TensorType::scalar()),
            Expr::Constant(name) => self
                .constants
                .get(name.as_str())
                .map(|t| (*t).clone())
                .ok_or_else(|| unbound(ReferenceKind::Constant, name)),
            Expr::Argument(name) => function
                .argument(name)
                .cloned()
                .ok_or_else(|| unbound(ReferenceKind::Argument, name)),
            Expr::Invoke {
                function: callee,
                arguments,
            } => self.type_of_invocation(callee, arguments, function),
            Expr::Unary { arg, .. } | Expr::In { value: arg, .. } => self.type_of(arg, function),
            Expr::Binary { .. } => {
                let (first, links) = expr.binary_chain();
                let mut tensor_type = self.type_of(first, function)?;
                for (_, right) in links {
                    let right = self.type_of(right, function)?;
                    tensor_type = tensor_type.join(&right).map_err(typed)?;
                }
                Ok(tensor_type)
            }
            Expr::If {
                condition,
                then_expr,
                else_expr,
            } => {
                let condition = self.type_of(condition, function)?;
                if !condition.is_scalar() {
                    return Err(typed(TensorError::NotScalar(condition)));
                }
                let then_type = self.type_of(then_expr, function)?;
                let else_type = self.type_of(else_expr, function)?;
                then_type.generalize(&else_type).map_err(typed)
            }
            Expr::Join {
                left,
                right,
                lambda,
            } => {
                check_arity(lambda, 2, function)?;
                let left = self.type_of(left, function)?;
                let right = self.type_of(right, function)?;
                left.join(&right).map_err(typed)
            }
            Expr::Map { arg, lambda } => {
                check_arity(lambda, 1, function)?;
                self.type_of(arg, function)
            }
            Expr::Reduce {
                arg, dimensions, ..
            } => self.type_of(arg, function)?.reduce(dimensions).map_err(typed),
            Expr::Rename { arg, from, to } => {
                self.type_of(arg, function)?.rename(from, to).map_err(typed)
            }
            Expr::Concat {
                left,
                right,
                dimension,
            } => {
                let left = self.type_of(left, function)?;
                let right = self.type_of(right, function)?;
                left.concat(&right, dimension).map_err(typed)
            }
            Expr::Create { tensor_type, cells } => {
                for (_, cell) in cells {
                    let cell_type = self.type_of(cell, function)?;
                    if !cell_type.is_scalar() {
                        return Err(typed(TensorError::NotScalar(cell_type)));
                    }
                }
                Ok(tensor_type.clone())
            }
        }
    }

    fn type_of_invocation(
        &mut self,
        callee: &'a str,
        arguments: &'a [Expr],
        function: &Declaration<'a>,
    ) -> Result<TensorType> {
        let declaration = match self.functions.get(callee) {
            Some(declaration) => declaration.clone(),
            None => {
                return Err(ResolveError::UnboundReference {
                    kind: ReferenceKind::Function,
                    name: callee.to_string(),
                    function: function.name.to_string(),
                })
            }
        };
        let invalid = |reason: String| ResolveError::InvalidInvocation {
            function: function.name.to_string(),
            callee: callee.to_string(),
            reason,
        };

        if arguments.is_empty() {
            // The callee evaluates against the caller's bindings.
            for (name, declared) in &declaration.arguments {
                match function.argument(name) {
                    Some(available) if available.is_assignable_to(declared) => {}
                    Some(available) => {
                        return Err(invalid(format!(
                            "argument '{}' is {} here but {} is required",
                            name, available, declared
                        )))
                    }
                    None => {
                        return Err(invalid(format!(
                            "argument '{}' is not declared by the caller",
                            name
                        )))
                    }
                }
            }
        } else {
            if arguments.len() != declaration.arguments.len() {
                return Err(invalid(format!(
                    "expected {} arguments, got {}",
                    declaration.arguments.len(),
                    arguments.len()
                )));
            }
            for (argument, (name, declared)) in arguments.iter().zip(&declaration.arguments) {
                let actual = self.type_of(argument, function)?;
                if !actual.is_assignable_to(declared) {
                    return Err(invalid(format!(
                        "argument '{}' is {} but {} is required",
                        name, actual, declared
                    )));
                }
            }
        }

        self.resolve(callee)
    }
}

fn check_arity(lambda: &Lambda, arity: usize, function: &Declaration<'_>) -> Result<()> {
    if lambda.arity() == arity {
        Ok(())
    } else {
        Err(ResolveError::InvalidLambda {
            function: function.name.to_string(),
            reason: format!(
                "{} takes {} parameters, {} required",
                lambda,
                lambda.arity(),
                arity
            ),
        })
    }
}

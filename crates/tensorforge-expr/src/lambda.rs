//! Inline scalar functions carried by join and map.

use std::fmt;
use std::sync::Arc;

use crate::expr::Expr;
use crate::ops::{BinaryOp, UnaryFunction};

/// A pure scalar function of one or two cell values.
///
/// Lambdas never see the evaluation context: a scalar lambda references
/// only its own parameters, and a native lambda is an opaque Rust closure.
#[derive(Clone)]
pub enum Lambda {
    Scalar(ScalarLambda),
    Native(NativeLambda),
}

impl Lambda {
    /// A lambda written in the expression language, e.g. `f(a,b)(a * b)`.
    pub fn scalar(params: &[&str], body: Expr) -> Result<Self, String> {
        ScalarLambda::new(params.iter().map(|p| p.to_string()).collect(), body).map(Lambda::Scalar)
    }

    /// `f(a,b)(a <op> b)`.
    pub fn binary(op: BinaryOp) -> Self {
        let body = Expr::binary(op, Expr::argument("a"), Expr::argument("b"));
        Lambda::Scalar(ScalarLambda::from_parts(vec!["a".into(), "b".into()], body))
    }

    /// `f(a)(<function>(a))`.
    pub fn unary(function: UnaryFunction) -> Self {
        let body = Expr::unary(function, Expr::argument("a"));
        Lambda::Scalar(ScalarLambda::from_parts(vec!["a".into()], body))
    }

    /// A named Rust closure of fixed arity.
    pub fn native(
        name: impl Into<String>,
        arity: usize,
        function: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Lambda::Native(NativeLambda {
            name: name.into(),
            arity,
            function: Arc::new(function),
        })
    }

    pub fn arity(&self) -> usize {
        match self {
            Lambda::Scalar(lambda) => lambda.params.len(),
            Lambda::Native(lambda) => lambda.arity,
        }
    }

    #[inline]
    pub fn apply1(&self, a: f64) -> f64 {
        match self {
            Lambda::Scalar(lambda) => lambda.apply(&[a]),
            Lambda::Native(lambda) => (lambda.function)(&[a]),
        }
    }

    #[inline]
    pub fn apply2(&self, a: f64, b: f64) -> f64 {
        match self {
            Lambda::Scalar(lambda) => lambda.apply(&[a, b]),
            Lambda::Native(lambda) => (lambda.function)(&[a, b]),
        }
    }
}

impl PartialEq for Lambda {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Lambda::Scalar(a), Lambda::Scalar(b)) => a.params == b.params && a.body == b.body,
            (Lambda::Native(a), Lambda::Native(b)) => {
                a.name == b.name && Arc::ptr_eq(&a.function, &b.function)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lambda::Scalar(_) => write!(f, "Lambda({})", self),
            Lambda::Native(lambda) => f
                .debug_struct("NativeLambda")
                .field("name", &lambda.name)
                .field("arity", &lambda.arity)
                .finish(),
        }
    }
}

/// Native lambdas print as their name and cannot be parsed back.
impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lambda::Scalar(lambda) => {
                write!(f, "f({})({})", lambda.params.join(","), lambda.body)
            }
            Lambda::Native(lambda) => f.write_str(&lambda.name),
        }
    }
}

/// Common body shapes evaluated without walking the tree.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Binary(BinaryOp, usize, usize),
    Unary(UnaryFunction, usize),
    General,
}

#[derive(Clone)]
pub struct ScalarLambda {
    params: Vec<String>,
    body: Box<Expr>,
    shape: Shape,
}

impl ScalarLambda {
    /// Checks that there are one or two distinct parameters and that the
    /// body is scalar arithmetic over them.
    pub fn new(params: Vec<String>, body: Expr) -> Result<Self, String> {
        if params.is_empty() || params.len() > 2 {
            return Err(format!(
                "a lambda takes one or two parameters, got {}",
                params.len()
            ));
        }
        if params.len() == 2 && params[0] == params[1] {
            return Err(format!("parameter '{}' is declared twice", params[0]));
        }
        check_body(&body, &params)?;
        Ok(Self::from_parts(params, body))
    }

    fn from_parts(params: Vec<String>, body: Expr) -> Self {
        let position = |e: &Expr| match e {
            Expr::Argument(name) => params.iter().position(|p| p == name),
            _ => None,
        };
        let shape = match &body {
            Expr::Binary { op, left, right } => match (position(left), position(right)) {
                (Some(a), Some(b)) => Shape::Binary(*op, a, b),
                _ => Shape::General,
            },
            Expr::Unary { function, arg } => match position(arg) {
                Some(a) => Shape::Unary(*function, a),
                None => Shape::General,
            },
            _ => Shape::General,
        };
        Self {
            params,
            body: Box::new(body),
            shape,
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    #[inline]
    pub fn apply(&self, args: &[f64]) -> f64 {
        match self.shape {
            Shape::Binary(op, a, b) => op.apply(args[a], args[b]),
            Shape::Unary(function, a) => function.apply(args[a]),
            Shape::General => eval(&self.body, &self.params, args),
        }
    }
}

fn check_body(expr: &Expr, params: &[String]) -> Result<(), String> {
    match expr {
        Expr::Number(_) => Ok(()),
        Expr::Argument(name) if params.contains(name) => Ok(()),
        Expr::Argument(name) => Err(format!("'{}' is not a parameter of the lambda", name)),
        Expr::Unary { arg, .. } | Expr::In { value: arg, .. } => check_body(arg, params),
        Expr::Binary { left, right, .. } => {
            check_body(left, params)?;
            check_body(right, params)
        }
        Expr::If {
            condition,
            then_expr,
            else_expr,
        } => {
            check_body(condition, params)?;
            check_body(then_expr, params)?;
            check_body(else_expr, params)
        }
        other => Err(format!("'{}' is not allowed inside a lambda", other)),
    }
}

fn eval(expr: &Expr, params: &[String], args: &[f64]) -> f64 {
    match expr {
        Expr::Number(value) => *value,
        Expr::Argument(name) => params
            .iter()
            .position(|p| p == name)
            .map_or(f64::NAN, |i| args[i]),
        Expr::Unary { function, arg } => function.apply(eval(arg, params, args)),
        Expr::Binary { op, left, right } => {
            op.apply(eval(left, params, args), eval(right, params, args))
        }
        Expr::If {
            condition,
            then_expr,
            else_expr,
        } => {
            if eval(condition, params, args) != 0.0 {
                eval(then_expr, params, args)
            } else {
                eval(else_expr, params, args)
            }
        }
        Expr::In { value, set } => {
            let v = eval(value, params, args);
            if set.contains(&v) {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

#[derive(Clone)]
pub struct NativeLambda {
    name: String,
    arity: usize,
    function: Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>,
}

impl NativeLambda {
    pub fn name(&self) -> &str {
        &self.name
    }
}

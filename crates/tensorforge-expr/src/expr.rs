//! Expression trees over tensors.

use std::ops::{Add, Div, Mul, Neg, Not, Sub};

use tensorforge_core::{Aggregator, TensorAddress, TensorType};

use crate::error::ParseError;
use crate::lambda::Lambda;
use crate::ops::{BinaryOp, UnaryFunction};

/// A node of a tensor expression.
///
/// Every node evaluates to a tensor; numbers are rank-0 tensors. The tree
/// is immutable once built and is matched exhaustively by the type
/// resolver, the printer and the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// `constant(name)`: a tensor held by the model.
    Constant(String),
    /// A value bound per evaluation.
    Argument(String),
    /// Another function of the model. With no arguments the callee sees
    /// the caller's bindings; otherwise they bind positionally.
    Invoke {
        function: String,
        arguments: Vec<Expr>,
    },
    Unary {
        function: UnaryFunction,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// 1 where the value is one of `set`, else 0.
    In {
        value: Box<Expr>,
        set: Vec<f64>,
    },
    Join {
        left: Box<Expr>,
        right: Box<Expr>,
        lambda: Lambda,
    },
    Reduce {
        arg: Box<Expr>,
        aggregator: Aggregator,
        dimensions: Vec<String>,
    },
    Rename {
        arg: Box<Expr>,
        from: Vec<String>,
        to: Vec<String>,
    },
    Map {
        arg: Box<Expr>,
        lambda: Lambda,
    },
    Concat {
        left: Box<Expr>,
        right: Box<Expr>,
        dimension: String,
    },
    /// A tensor whose cells are scalar expressions.
    Create {
        tensor_type: TensorType,
        cells: Vec<(TensorAddress, Expr)>,
    },
}

impl Expr {
    /// Parses an expression.
    ///
    /// ```
    /// use tensorforge_expr::Expr;
    ///
    /// let e = Expr::parse("reduce(join(x, constant(w), f(a,b)(a * b)), sum, d1)").unwrap();
    /// assert_eq!(e.to_string(), "reduce(join(x, constant(w), f(a,b)(a * b)), sum, d1)");
    /// ```
    pub fn parse(text: &str) -> Result<Expr, ParseError> {
        crate::parse::parse(text)
    }

    pub fn number(value: f64) -> Self {
        Expr::Number(value)
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Expr::Constant(name.into())
    }

    pub fn argument(name: impl Into<String>) -> Self {
        Expr::Argument(name.into())
    }

    /// A reference to a function that inherits the caller's bindings.
    pub fn reference(function: impl Into<String>) -> Self {
        Expr::Invoke {
            function: function.into(),
            arguments: Vec::new(),
        }
    }

    pub fn invoke(function: impl Into<String>, arguments: Vec<Expr>) -> Self {
        Expr::Invoke {
            function: function.into(),
            arguments,
        }
    }

    pub fn unary(function: UnaryFunction, arg: Expr) -> Self {
        Expr::Unary {
            function,
            arg: Box::new(arg),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn if_then_else(condition: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::If {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn is_in(value: Expr, set: Vec<f64>) -> Self {
        Expr::In {
            value: Box::new(value),
            set,
        }
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, left, right)
    }

    pub fn ge(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Ge, left, right)
    }

    pub fn join(left: Expr, right: Expr, lambda: Lambda) -> Self {
        Expr::Join {
            left: Box::new(left),
            right: Box::new(right),
            lambda,
        }
    }

    pub fn reduce(arg: Expr, aggregator: Aggregator, dimensions: &[&str]) -> Self {
        Expr::Reduce {
            arg: Box::new(arg),
            aggregator,
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn rename(arg: Expr, from: &[&str], to: &[&str]) -> Self {
        Expr::Rename {
            arg: Box::new(arg),
            from: from.iter().map(|d| d.to_string()).collect(),
            to: to.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn map(arg: Expr, lambda: Lambda) -> Self {
        Expr::Map {
            arg: Box::new(arg),
            lambda,
        }
    }

    pub fn concat(left: Expr, right: Expr, dimension: impl Into<String>) -> Self {
        Expr::Concat {
            left: Box::new(left),
            right: Box::new(right),
            dimension: dimension.into(),
        }
    }

    /// Direct subexpressions, excluding lambda bodies.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Number(_) | Expr::Constant(_) | Expr::Argument(_) => Vec::new(),
            Expr::Invoke { arguments, .. } => arguments.iter().collect(),
            Expr::Unary { arg, .. }
            | Expr::In { value: arg, .. }
            | Expr::Reduce { arg, .. }
            | Expr::Rename { arg, .. }
            | Expr::Map { arg, .. } => vec![&**arg],
            Expr::Binary { left, right, .. }
            | Expr::Join { left, right, .. }
            | Expr::Concat { left, right, .. } => vec![&**left, &**right],
            Expr::If {
                condition,
                then_expr,
                else_expr,
            } => vec![&**condition, &**then_expr, &**else_expr],
            Expr::Create { cells, .. } => cells.iter().map(|(_, e)| e).collect(),
        }
    }

    fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Number(_) | Expr::Constant(_) | Expr::Argument(_) => Vec::new(),
            Expr::Invoke { arguments, .. } => arguments.iter_mut().collect(),
            Expr::Unary { arg, .. }
            | Expr::In { value: arg, .. }
            | Expr::Reduce { arg, .. }
            | Expr::Rename { arg, .. }
            | Expr::Map { arg, .. } => vec![&mut **arg],
            Expr::Binary { left, right, .. }
            | Expr::Join { left, right, .. }
            | Expr::Concat { left, right, .. } => vec![&mut **left, &mut **right],
            Expr::If {
                condition,
                then_expr,
                else_expr,
            } => vec![&mut **condition, &mut **then_expr, &mut **else_expr],
            Expr::Create { cells, .. } => cells.iter_mut().map(|(_, e)| e).collect(),
        }
    }

    /// Unrolls a left-nested chain of binary operators such as
    /// `a + b - c + d` into its innermost left operand and each operator
    /// with its right operand, in evaluation order.
    ///
    /// Tree ensembles are sums of thousands of terms, so passes over the
    /// tree walk this chain in a loop rather than recursing per term.
    ///
    /// ```
    /// use tensorforge_expr::{BinaryOp, Expr};
    ///
    /// let e = Expr::parse("a + b - c").unwrap();
    /// let (first, links) = e.binary_chain();
    /// assert_eq!(first, &Expr::argument("a"));
    /// assert_eq!(links[1], (BinaryOp::Sub, &Expr::argument("c")));
    /// ```
    pub fn binary_chain(&self) -> (&Expr, Vec<(BinaryOp, &Expr)>) {
        let mut links = Vec::new();
        let mut node = self;
        while let Expr::Binary { op, left, right } = node {
            links.push((*op, &**right));
            node = left;
        }
        links.reverse();
        (node, links)
    }

    /// Visits this node and every subexpression in pre-order.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        let mut pending = vec![self];
        while let Some(expr) = pending.pop() {
            f(expr);
            pending.extend(expr.children().into_iter().rev());
        }
    }

    /// Turns each argument reference whose name `is_function` accepts into
    /// a reference to that function.
    pub fn link_functions(&mut self, is_function: &impl Fn(&str) -> bool) {
        let mut pending = vec![self];
        while let Some(expr) = pending.pop() {
            if let Expr::Argument(name) = expr {
                if is_function(name) {
                    *expr = Expr::reference(std::mem::take(name));
                }
                continue;
            }
            pending.extend(expr.children_mut());
        }
    }

    /// Names of the functions this expression invokes, in first-use order.
    pub fn invoked_functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let mut pending = vec![self];
        while let Some(expr) = pending.pop() {
            if let Expr::Invoke { function, .. } = expr {
                if !names.contains(&function.as_str()) {
                    names.push(function);
                }
            }
            pending.extend(expr.children().into_iter().rev());
        }
        names
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        // Detach the left spine node by node; the default drop would
        // recurse once per term of a long sum.
        let Expr::Binary { left, .. } = self else {
            return;
        };
        let mut next = std::mem::replace(&mut **left, Expr::Number(0.0));
        while let Expr::Binary { left, .. } = &mut next {
            let inner = std::mem::replace(&mut **left, Expr::Number(0.0));
            next = inner;
        }
    }
}

impl std::str::FromStr for Expr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expr::parse(s)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Number(value)
    }
}

// Operator syntax for building expressions

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::binary(BinaryOp::Div, self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Self::Output {
        Expr::unary(UnaryFunction::Neg, self)
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        Expr::unary(UnaryFunction::Not, self)
    }
}

//! Scalar operators and builtin functions.

use std::fmt;

/// Binary operators, applied cell-wise through a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Max,
    Min,
    Atan2,
}

impl BinaryOp {
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Lt => truth(a < b),
            BinaryOp::Le => truth(a <= b),
            BinaryOp::Gt => truth(a > b),
            BinaryOp::Ge => truth(a >= b),
            BinaryOp::Eq => truth(a == b),
            BinaryOp::Ne => truth(a != b),
            BinaryOp::And => truth(a != 0.0 && b != 0.0),
            BinaryOp::Or => truth(a != 0.0 || b != 0.0),
            BinaryOp::Max => a.max(b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Atan2 => a.atan2(b),
        }
    }

    /// The infix symbol, or `None` for operators written as functions.
    pub fn symbol(self) -> Option<&'static str> {
        Some(match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Max | BinaryOp::Min | BinaryOp::Atan2 => return None,
        })
    }

    /// Name of an operator that is only written as a function call.
    pub fn function_name(self) -> Option<&'static str> {
        match self {
            BinaryOp::Max => Some("max"),
            BinaryOp::Min => Some("min"),
            BinaryOp::Atan2 => Some("atan2"),
            _ => None,
        }
    }

    pub(crate) fn from_function_name(name: &str) -> Option<Self> {
        Some(match name {
            "max" => BinaryOp::Max,
            "min" => BinaryOp::Min,
            "atan2" => BinaryOp::Atan2,
            "pow" => BinaryOp::Pow,
            "fmod" => BinaryOp::Mod,
            _ => return None,
        })
    }

    /// Binding strength when printed infix; function-style operators bind
    /// like primaries.
    pub(crate) fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 5,
            BinaryOp::Pow => 6,
            BinaryOp::Max | BinaryOp::Min | BinaryOp::Atan2 => 8,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol().or_else(|| self.function_name()) {
            Some(name) => f.write_str(name),
            None => Ok(()),
        }
    }
}

/// Single-argument functions, applied cell-wise through a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryFunction {
    Neg,
    Not,
    Abs,
    Exp,
    Log,
    Log10,
    Sqrt,
    Tanh,
    Sigmoid,
    Relu,
    Floor,
    Ceil,
    Sin,
    Cos,
    Elu,
}

impl UnaryFunction {
    const NAMED: [UnaryFunction; 13] = [
        UnaryFunction::Abs,
        UnaryFunction::Exp,
        UnaryFunction::Log,
        UnaryFunction::Log10,
        UnaryFunction::Sqrt,
        UnaryFunction::Tanh,
        UnaryFunction::Sigmoid,
        UnaryFunction::Relu,
        UnaryFunction::Floor,
        UnaryFunction::Ceil,
        UnaryFunction::Sin,
        UnaryFunction::Cos,
        UnaryFunction::Elu,
    ];

    #[inline]
    pub fn apply(self, a: f64) -> f64 {
        match self {
            UnaryFunction::Neg => -a,
            UnaryFunction::Not => truth(a == 0.0),
            UnaryFunction::Abs => a.abs(),
            UnaryFunction::Exp => a.exp(),
            UnaryFunction::Log => a.ln(),
            UnaryFunction::Log10 => a.log10(),
            UnaryFunction::Sqrt => a.sqrt(),
            UnaryFunction::Tanh => a.tanh(),
            UnaryFunction::Sigmoid => 1.0 / (1.0 + (-a).exp()),
            UnaryFunction::Relu => a.max(0.0),
            UnaryFunction::Floor => a.floor(),
            UnaryFunction::Ceil => a.ceil(),
            UnaryFunction::Sin => a.sin(),
            UnaryFunction::Cos => a.cos(),
            UnaryFunction::Elu => {
                if a < 0.0 {
                    a.exp() - 1.0
                } else {
                    a
                }
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            UnaryFunction::Neg => "-",
            UnaryFunction::Not => "!",
            UnaryFunction::Abs => "abs",
            UnaryFunction::Exp => "exp",
            UnaryFunction::Log => "log",
            UnaryFunction::Log10 => "log10",
            UnaryFunction::Sqrt => "sqrt",
            UnaryFunction::Tanh => "tanh",
            UnaryFunction::Sigmoid => "sigmoid",
            UnaryFunction::Relu => "relu",
            UnaryFunction::Floor => "floor",
            UnaryFunction::Ceil => "ceil",
            UnaryFunction::Sin => "sin",
            UnaryFunction::Cos => "cos",
            UnaryFunction::Elu => "elu",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::NAMED.into_iter().find(|f| f.name() == name)
    }

    /// Whether this is the prefix operator `-` or `!`.
    pub fn is_prefix(self) -> bool {
        matches!(self, UnaryFunction::Neg | UnaryFunction::Not)
    }
}

impl fmt::Display for UnaryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

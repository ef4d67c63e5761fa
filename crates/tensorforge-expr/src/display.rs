//! Printing expressions back into the textual grammar.
//!
//! Parentheses are emitted only where precedence or associativity requires
//! them, so that parsing the output yields an equal tree.

use std::fmt::{self, Display, Formatter, Write};

use crate::expr::Expr;
use crate::ops::{BinaryOp, UnaryFunction};

const PREFIX: u8 = 7;
const PRIMARY: u8 = 8;
const COMPARISON: u8 = 3;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => op.precedence(),
        Expr::In { .. } => COMPARISON,
        Expr::Unary { function, .. } if function.is_prefix() => PREFIX,
        _ => PRIMARY,
    }
}

/// Writes `expr`, parenthesized when it binds looser than `min`.
fn write_operand(f: &mut Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if precedence(expr) < min {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Infix operators whose left operand of equal precedence prints bare.
fn is_left_chained(op: BinaryOp) -> bool {
    op.symbol().is_some() && !matches!(op.precedence(), COMPARISON | 6)
}

/// Writes a run of left-nested operators of precedence `p` in one pass.
fn write_chain(f: &mut Formatter<'_>, expr: &Expr, p: u8) -> fmt::Result {
    let mut links = Vec::new();
    let mut node = expr;
    while let Expr::Binary { op, left, right } = node {
        match op.symbol() {
            Some(symbol) if op.precedence() == p && is_left_chained(*op) => {
                links.push((symbol, &**right));
                node = left;
            }
            _ => break,
        }
    }
    write_operand(f, node, p)?;
    for (symbol, right) in links.into_iter().rev() {
        write!(f, " {} ", symbol)?;
        write_operand(f, right, p + 1)?;
    }
    Ok(())
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_dimensions(f: &mut Formatter<'_>, names: &[String]) -> fmt::Result {
    match names {
        [single] => f.write_str(single),
        _ => {
            f.write_char('(')?;
            write_list(f, names)?;
            f.write_char(')')
        }
    }
}

fn write_name(f: &mut Formatter<'_>, name: &str) -> fmt::Result {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if plain {
        return f.write_str(name);
    }
    f.write_char('"')?;
    for c in name.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{:?}", value),
            Expr::Constant(name) => {
                f.write_str("constant(")?;
                write_name(f, name)?;
                f.write_char(')')
            }
            Expr::Argument(name) => f.write_str(name),
            Expr::Invoke {
                function,
                arguments,
            } => {
                if arguments.is_empty() {
                    f.write_str("rankingExpression(")?;
                    write_name(f, function)?;
                    return f.write_char(')');
                }
                write!(f, "{}(", function)?;
                write_list(f, arguments)?;
                f.write_char(')')
            }
            Expr::Unary { function, arg } => match function {
                UnaryFunction::Neg | UnaryFunction::Not => {
                    f.write_str(function.name())?;
                    // `-1.0` would read back as a number
                    if matches!(**arg, Expr::Number(_)) && *function == UnaryFunction::Neg {
                        write!(f, "({})", arg)
                    } else {
                        write_operand(f, arg, PREFIX)
                    }
                }
                _ => write!(f, "{}({})", function, arg),
            },
            Expr::Binary { op, .. } if is_left_chained(*op) => write_chain(f, self, op.precedence()),
            Expr::Binary { op, left, right } => match op.symbol() {
                Some(symbol) => {
                    let p = op.precedence();
                    let (left_min, right_min) = if op.is_comparison() {
                        (p + 1, p + 1)
                    } else if p == 6 {
                        (p + 1, p)
                    } else {
                        (p, p + 1)
                    };
                    write_operand(f, left, left_min)?;
                    write!(f, " {} ", symbol)?;
                    write_operand(f, right, right_min)
                }
                None => write!(f, "{}({}, {})", op, left, right),
            },
            Expr::If {
                condition,
                then_expr,
                else_expr,
            } => write!(f, "if ({}, {}, {})", condition, then_expr, else_expr),
            Expr::In { value, set } => {
                write_operand(f, value, COMPARISON + 1)?;
                f.write_str(" in [")?;
                let set: Vec<String> = set.iter().map(|v| format!("{:?}", v)).collect();
                write_list(f, &set)?;
                f.write_char(']')
            }
            Expr::Join {
                left,
                right,
                lambda,
            } => write!(f, "join({}, {}, {})", left, right, lambda),
            Expr::Reduce {
                arg,
                aggregator,
                dimensions,
            } => {
                write!(f, "reduce({}, {}", arg, aggregator)?;
                for dimension in dimensions {
                    write!(f, ", {}", dimension)?;
                }
                f.write_char(')')
            }
            Expr::Rename { arg, from, to } => {
                write!(f, "rename({}, ", arg)?;
                write_dimensions(f, from)?;
                f.write_str(", ")?;
                write_dimensions(f, to)?;
                f.write_char(')')
            }
            Expr::Map { arg, lambda } => write!(f, "map({}, {})", arg, lambda),
            Expr::Concat {
                left,
                right,
                dimension,
            } => write!(f, "concat({}, {}, {})", left, right, dimension),
            Expr::Create { tensor_type, cells } => {
                write!(f, "{}:{{", tensor_type)?;
                for (i, (address, value)) in cells.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    f.write_char('{')?;
                    for (j, (dimension, label)) in tensor_type
                        .dimensions()
                        .iter()
                        .zip(address.labels())
                        .enumerate()
                    {
                        if j > 0 {
                            f.write_char(',')?;
                        }
                        write!(f, "{}:{}", dimension.name(), label)?;
                    }
                    write!(f, "}}:{}", value)?;
                }
                f.write_char('}')
            }
        }
    }
}

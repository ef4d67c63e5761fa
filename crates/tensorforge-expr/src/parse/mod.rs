//! Recursive-descent parser for the expression language.
//!
//! ```text
//! expr    := or
//! or      := and ('||' and)*
//! and     := cmp ('&&' cmp)*
//! cmp     := add (cmp-op add | 'in' '[' number (',' number)* ']')?
//! add     := mul (('+'|'-') mul)*
//! mul     := pow (('*'|'/'|'%') pow)*
//! pow     := unary ('^' pow)?
//! unary   := '-' unary | '!' unary | primary
//! ```

mod lexer;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use tensorforge_core::{Aggregator, Dimension, Label, TensorAddress, TensorType};

use self::lexer::{tokenize, Token, TokenKind};
use crate::error::ParseError;
use crate::expr::Expr;
use crate::lambda::Lambda;
use crate::ops::{BinaryOp, UnaryFunction};

type Result<T> = std::result::Result<T, ParseError>;

pub(crate) fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    match parser.peek() {
        TokenKind::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected {:?} after expression", other))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let i = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn position(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].start
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, expected: &TokenKind) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<()> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, got {:?}", expected, self.peek())))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.position(), message)
    }

    fn ident(&mut self) -> Result<String> {
        match self.advance() {
            TokenKind::Ident(name) => Ok(name),
            other => Err(ParseError::new(
                self.tokens[self.pos.saturating_sub(1)].start,
                format!("expected a name, got {:?}", other),
            )),
        }
    }

    // Grammar rules

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_cmp()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_cmp()?;
            lhs = Expr::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Ident(word) if word == "in" => {
                self.advance();
                return Ok(Expr::is_in(lhs, self.parse_number_set()?));
            }
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_add()?;
        Ok(Expr::binary(op, lhs, rhs))
    }

    fn parse_number_set(&mut self) -> Result<Vec<f64>> {
        self.expect(TokenKind::LBracket)?;
        let mut set = Vec::new();
        if self.eat(&TokenKind::RBracket) {
            return Ok(set);
        }
        set.push(self.parse_signed_number()?);
        while self.eat(&TokenKind::Comma) {
            set.push(self.parse_signed_number()?);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(set)
    }

    fn parse_signed_number(&mut self) -> Result<f64> {
        let negative = self.eat(&TokenKind::Minus);
        let value = match self.advance() {
            TokenKind::Num(value) => value,
            TokenKind::Ident(word) => match special_number(&word) {
                Some(value) => value,
                None => return Err(self.error(format!("expected a number, got '{}'", word))),
            },
            other => return Err(self.error(format!("expected a number, got {:?}", other))),
        };
        Ok(if negative { -value } else { value })
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_pow()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_pow()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_pow(&mut self) -> Result<Expr> {
        let base = self.parse_unary()?;
        if self.eat(&TokenKind::Caret) {
            let exponent = self.parse_pow()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.peek() {
            TokenKind::Minus => {
                let literal = match self.peek_at(1) {
                    TokenKind::Num(value) => Some(*value),
                    TokenKind::Ident(word) => special_number(word),
                    _ => None,
                };
                self.advance();
                if let Some(value) = literal {
                    self.advance();
                    return Ok(Expr::Number(-value));
                }
                Ok(Expr::unary(UnaryFunction::Neg, self.parse_unary()?))
            }
            TokenKind::Not => {
                self.advance();
                Ok(Expr::unary(UnaryFunction::Not, self.parse_unary()?))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let start = self.position();
        match self.advance() {
            TokenKind::Num(value) => Ok(Expr::Number(value)),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.parse_named(name, start),
            other => Err(ParseError::new(
                start,
                format!("unexpected {:?}", other),
            )),
        }
    }

    fn parse_named(&mut self, name: String, start: usize) -> Result<Expr> {
        if let Some(value) = special_number(&name) {
            return Ok(Expr::Number(value));
        }
        if name == "tensor" && matches!(self.peek(), TokenKind::LParen | TokenKind::Lt) {
            return self.parse_create();
        }
        if !self.eat(&TokenKind::LParen) {
            return Ok(Expr::Argument(name));
        }

        let expr = match name.as_str() {
            "if" => {
                let condition = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let then_expr = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let else_expr = self.parse_expr()?;
                Expr::if_then_else(condition, then_expr, else_expr)
            }
            "join" => {
                let left = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let right = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let lambda = self.parse_lambda(2)?;
                Expr::join(left, right, lambda)
            }
            "map" => {
                let arg = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let lambda = self.parse_lambda(1)?;
                Expr::map(arg, lambda)
            }
            "reduce" => {
                let arg = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let aggregator_start = self.position();
                let aggregator = self
                    .ident()?
                    .parse::<Aggregator>()
                    .map_err(|message| ParseError::new(aggregator_start, message))?;
                let mut dimensions = Vec::new();
                while self.eat(&TokenKind::Comma) {
                    dimensions.push(self.ident()?);
                }
                Expr::Reduce {
                    arg: Box::new(arg),
                    aggregator,
                    dimensions,
                }
            }
            "rename" => {
                let arg = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let from = self.parse_dimension_list()?;
                self.expect(TokenKind::Comma)?;
                let to = self.parse_dimension_list()?;
                Expr::Rename {
                    arg: Box::new(arg),
                    from,
                    to,
                }
            }
            "concat" => {
                let left = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let right = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let dimension = self.ident()?;
                Expr::concat(left, right, dimension)
            }
            "constant" => Expr::Constant(self.parse_reference_name()?),
            "rankingExpression" => Expr::reference(self.parse_reference_name()?),
            "query" | "attribute" => {
                let inner = self.parse_reference_name()?;
                Expr::Argument(format!("{}({})", name, inner))
            }
            _ => {
                let arguments = self.parse_arguments()?;
                return self.finish_call(name, arguments, start);
            }
        };
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    /// A name inside `constant(...)` and friends; quoted names are allowed.
    fn parse_reference_name(&mut self) -> Result<String> {
        match self.advance() {
            TokenKind::Ident(name) | TokenKind::Str(name) => Ok(name),
            other => Err(self.error(format!("expected a name, got {:?}", other))),
        }
    }

    /// Comma-separated expressions up to and including `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut arguments = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expr()?);
            if self.eat(&TokenKind::RParen) {
                return Ok(arguments);
            }
            self.expect(TokenKind::Comma)?;
        }
    }

    fn finish_call(&mut self, name: String, mut arguments: Vec<Expr>, start: usize) -> Result<Expr> {
        if let Some(function) = UnaryFunction::from_name(&name) {
            if arguments.len() != 1 {
                return Err(ParseError::new(
                    start,
                    format!("{} takes 1 argument, got {}", name, arguments.len()),
                ));
            }
            return Ok(Expr::unary(function, arguments.remove(0)));
        }
        if let Some(op) = BinaryOp::from_function_name(&name) {
            if arguments.len() != 2 {
                return Err(ParseError::new(
                    start,
                    format!("{} takes 2 arguments, got {}", name, arguments.len()),
                ));
            }
            let right = arguments.remove(1);
            let left = arguments.remove(0);
            return Ok(Expr::binary(op, left, right));
        }
        Ok(Expr::invoke(name, arguments))
    }

    /// A single dimension name or a parenthesized list of them.
    fn parse_dimension_list(&mut self) -> Result<Vec<String>> {
        if !self.eat(&TokenKind::LParen) {
            return Ok(vec![self.ident()?]);
        }
        let mut names = vec![self.ident()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.ident()?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(names)
    }

    /// `f(a,b)(body)`.
    fn parse_lambda(&mut self, arity: usize) -> Result<Lambda> {
        let start = self.position();
        match self.advance() {
            TokenKind::Ident(f) if f == "f" => {}
            other => {
                return Err(ParseError::new(
                    start,
                    format!("expected a lambda 'f(...)(...)', got {:?}", other),
                ))
            }
        }
        self.expect(TokenKind::LParen)?;
        let mut params = vec![self.ident()?];
        while self.eat(&TokenKind::Comma) {
            params.push(self.ident()?);
        }
        self.expect(TokenKind::RParen)?;
        if params.len() != arity {
            return Err(ParseError::new(
                start,
                format!("expected a lambda of {} parameters, got {}", arity, params.len()),
            ));
        }
        self.expect(TokenKind::LParen)?;
        let body = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        Lambda::scalar(&params, body).map_err(|message| ParseError::new(start, message))
    }

    /// `tensor(x{},y[2]):{{x:a,y:0}:expr,...}`, a single mapped dimension's
    /// `{a:expr,...}`, or a dense nested list `[expr,...]`.
    fn parse_create(&mut self) -> Result<Expr> {
        let tensor_type = self.parse_type()?;
        self.expect(TokenKind::Colon)?;
        let mut cells = Vec::new();
        if matches!(self.peek(), TokenKind::LBracket) {
            if !tensor_type.is_dense() {
                return Err(self.error("a nested list requires only indexed dimensions"));
            }
            let mut prefix = Vec::new();
            self.parse_dense_cells(&tensor_type, &mut prefix, &mut cells)?;
        } else {
            self.expect(TokenKind::LBrace)?;
            if !self.eat(&TokenKind::RBrace) {
                loop {
                    let address = if matches!(self.peek(), TokenKind::LBrace) {
                        self.parse_address(&tensor_type)?
                    } else if tensor_type.rank() == 1 && tensor_type.is_sparse() {
                        TensorAddress::from(vec![Label::Mapped(self.parse_label()?)])
                    } else {
                        return Err(self.error("expected a cell address '{...}'"));
                    };
                    self.expect(TokenKind::Colon)?;
                    cells.push((address, self.parse_expr()?));
                    if self.eat(&TokenKind::RBrace) {
                        break;
                    }
                    self.expect(TokenKind::Comma)?;
                }
            }
        }

        let mut seen = HashSet::new();
        for (address, _) in &cells {
            if !seen.insert(address) {
                return Err(self.error(format!("cell {} is given twice", address)));
            }
        }
        Ok(Expr::Create { tensor_type, cells })
    }

    fn parse_type(&mut self) -> Result<TensorType> {
        let start = self.position();
        if self.eat(&TokenKind::Lt) {
            let value_type = self.ident()?;
            if value_type != "double" {
                return Err(ParseError::new(
                    start,
                    format!("unsupported cell type '{}'", value_type),
                ));
            }
            self.expect(TokenKind::Gt)?;
        }
        self.expect(TokenKind::LParen)?;
        let mut dimensions = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                let name = self.ident()?;
                if self.eat(&TokenKind::LBrace) {
                    self.expect(TokenKind::RBrace)?;
                    dimensions.push(Dimension::mapped(name));
                } else {
                    self.expect(TokenKind::LBracket)?;
                    if self.eat(&TokenKind::RBracket) {
                        dimensions.push(Dimension::indexed_unbound(name));
                    } else {
                        let size = self.parse_index()?;
                        self.expect(TokenKind::RBracket)?;
                        dimensions.push(Dimension::indexed(name, size));
                    }
                }
                if self.eat(&TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
        }
        TensorType::new(dimensions).map_err(|e| ParseError::new(start, e.to_string()))
    }

    fn parse_index(&mut self) -> Result<usize> {
        let start = self.position();
        match self.advance() {
            TokenKind::Num(value) if value >= 0.0 && value.fract() == 0.0 => Ok(value as usize),
            other => Err(ParseError::new(
                start,
                format!("expected an index, got {:?}", other),
            )),
        }
    }

    fn parse_label(&mut self) -> Result<String> {
        let start = self.position();
        match self.advance() {
            TokenKind::Ident(label) | TokenKind::Str(label) => Ok(label),
            TokenKind::Num(value) if value >= 0.0 && value.fract() == 0.0 => {
                Ok((value as u64).to_string())
            }
            other => Err(ParseError::new(
                start,
                format!("expected a label, got {:?}", other),
            )),
        }
    }

    fn parse_address(&mut self, tensor_type: &TensorType) -> Result<TensorAddress> {
        let start = self.position();
        self.expect(TokenKind::LBrace)?;
        let mut labels: Vec<Option<Label>> = vec![None; tensor_type.rank()];
        if !self.eat(&TokenKind::RBrace) {
            loop {
                let name_start = self.position();
                let name = self.ident()?;
                let position = tensor_type.index_of(&name).ok_or_else(|| {
                    ParseError::new(name_start, format!("unknown dimension '{}'", name))
                })?;
                self.expect(TokenKind::Colon)?;
                let label = match tensor_type.dimensions()[position].size() {
                    _ if tensor_type.dimensions()[position].is_mapped() => {
                        Label::Mapped(self.parse_label()?)
                    }
                    Some(size) => {
                        let index = self.parse_index()?;
                        if index >= size {
                            return Err(ParseError::new(
                                name_start,
                                format!("index {} is out of range for '{}'", index, name),
                            ));
                        }
                        Label::Indexed(index)
                    }
                    None => Label::Indexed(self.parse_index()?),
                };
                if labels[position].replace(label).is_some() {
                    return Err(ParseError::new(
                        name_start,
                        format!("dimension '{}' is labeled twice", name),
                    ));
                }
                if self.eat(&TokenKind::RBrace) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
        }
        labels
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(TensorAddress::from)
            .ok_or_else(|| ParseError::new(start, "address does not label every dimension"))
    }

    fn parse_dense_cells(
        &mut self,
        tensor_type: &TensorType,
        prefix: &mut Vec<usize>,
        cells: &mut Vec<(TensorAddress, Expr)>,
    ) -> Result<()> {
        let depth = prefix.len();
        if depth == tensor_type.rank() {
            let address = prefix.iter().map(|&i| Label::Indexed(i)).collect();
            cells.push((address, self.parse_expr()?));
            return Ok(());
        }
        let start = self.position();
        self.expect(TokenKind::LBracket)?;
        let mut count = 0;
        if !self.eat(&TokenKind::RBracket) {
            loop {
                prefix.push(count);
                self.parse_dense_cells(tensor_type, prefix, cells)?;
                prefix.pop();
                count += 1;
                if self.eat(&TokenKind::RBracket) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
        }
        if let Some(size) = tensor_type.dimensions()[depth].size() {
            if size != count {
                return Err(ParseError::new(
                    start,
                    format!(
                        "dimension {} has {} values",
                        tensor_type.dimensions()[depth],
                        count
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn special_number(word: &str) -> Option<f64> {
    match word {
        "NaN" | "nan" => Some(f64::NAN),
        "inf" | "Infinity" => Some(f64::INFINITY),
        _ => None,
    }
}

//! Parsing of tensor type specifications.

use super::dimension::Dimension;
use super::tensor_type::TensorType;
use crate::error::{Result, TensorError};

/// Whether `s` is a plain name: a letter or `_` followed by letters,
/// digits or `_`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parses a type specification at the start of `input`.
///
/// Returns the type and the number of bytes consumed, so that callers
/// parsing a tensor literal can continue after the type.
pub(crate) fn parse_type_prefix(input: &str) -> Result<(TensorType, usize)> {
    let mut cursor = Cursor::new(input);
    cursor.skip_whitespace();
    if !cursor.eat_word("tensor") {
        return Err(cursor.error("expected 'tensor'"));
    }
    cursor.skip_whitespace();
    if cursor.eat('<') {
        let value_type = cursor.take_while(|c| c.is_ascii_alphanumeric());
        if value_type != "double" {
            return Err(cursor.error(&format!("unsupported cell type '{}'", value_type)));
        }
        if !cursor.eat('>') {
            return Err(cursor.error("expected '>'"));
        }
        cursor.skip_whitespace();
    }
    if !cursor.eat('(') {
        return Err(cursor.error("expected '('"));
    }

    let mut dimensions = Vec::new();
    cursor.skip_whitespace();
    if !cursor.eat(')') {
        loop {
            cursor.skip_whitespace();
            let name = cursor.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            if !is_identifier(name) {
                return Err(cursor.error("expected a dimension name"));
            }
            cursor.skip_whitespace();
            if cursor.eat('{') {
                cursor.skip_whitespace();
                if !cursor.eat('}') {
                    return Err(cursor.error("expected '}'"));
                }
                dimensions.push(Dimension::mapped(name));
            } else if cursor.eat('[') {
                cursor.skip_whitespace();
                let digits = cursor.take_while(|c| c.is_ascii_digit());
                cursor.skip_whitespace();
                if !cursor.eat(']') {
                    return Err(cursor.error("expected ']'"));
                }
                if digits.is_empty() {
                    dimensions.push(Dimension::indexed_unbound(name));
                } else {
                    let size = digits
                        .parse::<usize>()
                        .map_err(|_| cursor.error("dimension size out of range"))?;
                    dimensions.push(Dimension::indexed(name, size));
                }
            } else {
                return Err(cursor.error("expected '{' or '['"));
            }
            cursor.skip_whitespace();
            if cursor.eat(')') {
                break;
            }
            if !cursor.eat(',') {
                return Err(cursor.error("expected ',' or ')'"));
            }
        }
    }

    let consumed = cursor.position;
    let tensor_type = TensorType::new(dimensions).map_err(|e| match e {
        TensorError::InvalidType { reason, .. } => TensorError::InvalidType {
            spec: input[..consumed].trim().to_string(),
            reason,
        },
        other => other,
    })?;
    Ok((tensor_type, consumed))
}

struct Cursor<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.position += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.rest().starts_with(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.rest().starts_with(word) {
            self.position += word.len();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !predicate(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.position += len;
        &rest[..len]
    }

    fn error(&self, reason: &str) -> TensorError {
        TensorError::InvalidType {
            spec: self.input.trim().to_string(),
            reason: format!("{} at position {}", reason, self.position),
        }
    }
}

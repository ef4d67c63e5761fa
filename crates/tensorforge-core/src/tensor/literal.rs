//! The tensor literal format.
//!
//! A literal is a type followed by `:` and the cells:
//!
//! ```text
//! tensor():3.5
//! tensor(x[2],y[3]):[[1.0,2.0,3.0],[4.0,5.0,6.0]]
//! tensor(x{}):{a:1.0,b:2.0}
//! tensor(x{},y[2]):{a:[1.0,2.0]}
//! tensor(x{},y{}):{{x:a,y:b}:1.0}
//! ```

use std::fmt::{self, Write};

use super::address::{Label, TensorAddress};
use super::storage::{strides, DenseBlock, Storage};
use super::{Tensor, TensorBuilder};
use crate::error::{Result, TensorError};
use crate::types::{parse_type_prefix, Dimension, TensorType};

impl Tensor {
    /// Parses a tensor literal.
    ///
    /// ```
    /// use tensorforge_core::{Label, Tensor, TensorAddress};
    ///
    /// let t = Tensor::from_literal("tensor(x{},y[2]):{a:[1.0,2.0],b:[3.0,4.0]}").unwrap();
    /// let address = TensorAddress::from([Label::mapped("b"), Label::Indexed(1)]);
    /// assert_eq!(t.get(&address), 4.0);
    /// assert_eq!(t.to_literal(), "tensor(x{},y[2]):{a:[1.0,2.0],b:[3.0,4.0]}");
    /// ```
    pub fn from_literal(text: &str) -> Result<Tensor> {
        let (tensor_type, consumed) = parse_type_prefix(text)?;
        let mut scanner = Scanner {
            text,
            position: consumed,
        };
        scanner.expect(':')?;
        let tensor = scanner.value(tensor_type)?;
        scanner.skip_whitespace();
        if scanner.position < text.len() {
            return Err(scanner.error("unexpected trailing input"));
        }
        Ok(tensor)
    }

    /// Serializes this tensor in the literal format.
    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write_literal(self, &mut out);
        out
    }
}

pub(super) fn write_literal(tensor: &Tensor, f: &mut impl Write) -> fmt::Result {
    let tensor_type = tensor.tensor_type();
    write!(f, "{}:", tensor_type)?;
    match tensor.storage() {
        Storage::Dense(block) => write_block(f, &block.sizes, &block.values),
        Storage::Sparse(map) if tensor_type.rank() == 1 => {
            f.write_char('{')?;
            for (i, (address, value)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write!(f, "{}:{:?}", address.labels()[0], value)?;
            }
            f.write_char('}')
        }
        Storage::Mixed(mixed) if mixed.mapped.len() == 1 => {
            f.write_char('{')?;
            for (i, (key, block)) in mixed.blocks.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write_label(f, &key[0])?;
                f.write_char(':')?;
                write_block(f, &mixed.sizes, block)?;
            }
            f.write_char('}')
        }
        _ => {
            f.write_char('{')?;
            for (i, (address, value)) in tensor.cells().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                f.write_char('{')?;
                for (j, (dim, label)) in tensor_type
                    .dimensions()
                    .iter()
                    .zip(address.labels())
                    .enumerate()
                {
                    if j > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{}:{}", dim.name(), label)?;
                }
                write!(f, "}}:{:?}", value)?;
            }
            f.write_char('}')
        }
    }
}

fn write_label(f: &mut impl Write, label: &str) -> fmt::Result {
    write!(f, "{}", Label::Mapped(label.to_string()))
}

fn write_block(f: &mut impl Write, sizes: &[usize], values: &[f64]) -> fmt::Result {
    let Some((&outer, inner_sizes)) = sizes.split_first() else {
        return write!(f, "{:?}", values.first().copied().unwrap_or(0.0));
    };
    let inner: usize = inner_sizes.iter().product();
    f.write_char('[')?;
    for i in 0..outer {
        if i > 0 {
            f.write_char(',')?;
        }
        write_block(f, inner_sizes, &values[i * inner..(i + 1) * inner])?;
    }
    f.write_char(']')
}

struct Scanner<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.position..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.position += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn error(&self, message: &str) -> TensorError {
        TensorError::Parse {
            position: self.position,
            message: message.to_string(),
        }
    }

    fn token(&mut self) -> &'a str {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')))
            .unwrap_or(rest.len());
        self.position += len;
        &rest[..len]
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.position;
        let token = self.token();
        token.parse::<f64>().map_err(|_| TensorError::Parse {
            position: start,
            message: format!("invalid number '{}'", token),
        })
    }

    fn label(&mut self) -> Result<String> {
        if self.eat('"') {
            let mut label = String::new();
            let mut chars = self.rest().char_indices();
            while let Some((i, c)) = chars.next() {
                match c {
                    '"' => {
                        self.position += i + 1;
                        return Ok(label);
                    }
                    '\\' => match chars.next() {
                        Some((_, escaped)) => label.push(escaped),
                        None => break,
                    },
                    c => label.push(c),
                }
            }
            return Err(self.error("unterminated quoted label"));
        }
        let token = self.token();
        if token.is_empty() {
            return Err(self.error("expected a label"));
        }
        Ok(token.to_string())
    }

    fn index(&mut self) -> Result<usize> {
        let start = self.position;
        let token = self.token();
        token.parse::<usize>().map_err(|_| TensorError::Parse {
            position: start,
            message: format!("invalid index '{}'", token),
        })
    }

    fn value(&mut self, tensor_type: TensorType) -> Result<Tensor> {
        if tensor_type.is_scalar() {
            return Ok(Tensor::scalar(self.number()?));
        }
        match self.peek() {
            Some('[') => {
                if !tensor_type.is_dense() {
                    return Err(self.error("a nested list requires only indexed dimensions"));
                }
                let (sizes, values) = self.block(tensor_type.dimensions())?;
                check_sizes(&tensor_type, tensor_type.dimensions(), &sizes)?;
                Ok(Tensor::from_parts(
                    tensor_type,
                    Storage::Dense(DenseBlock { sizes, values }),
                ))
            }
            Some('{') => self.cells(tensor_type),
            _ => Err(self.error("expected '[' or '{'")),
        }
    }

    /// A nested list over `dims`, returning its shape and row-major values.
    fn block(&mut self, dims: &[Dimension]) -> Result<(Vec<usize>, Vec<f64>)> {
        let Some((_, inner_dims)) = dims.split_first() else {
            return Ok((Vec::new(), vec![self.number()?]));
        };
        self.expect('[')?;
        let mut inner_shape: Option<Vec<usize>> = None;
        let mut values = Vec::new();
        let mut count = 0;
        if !self.eat(']') {
            loop {
                let start = self.position;
                let (shape, mut block) = self.block(inner_dims)?;
                match &inner_shape {
                    Some(expected) if *expected != shape => {
                        return Err(TensorError::Parse {
                            position: start,
                            message: "nested lists have different lengths".to_string(),
                        })
                    }
                    Some(_) => {}
                    None => inner_shape = Some(shape),
                }
                values.append(&mut block);
                count += 1;
                if self.eat(']') {
                    break;
                }
                self.expect(',')?;
            }
        }
        let inner_shape = inner_shape
            .unwrap_or_else(|| inner_dims.iter().map(|d| d.size().unwrap_or(0)).collect());
        let mut sizes = Vec::with_capacity(dims.len());
        sizes.push(count);
        sizes.extend(inner_shape);
        Ok((sizes, values))
    }

    fn cells(&mut self, tensor_type: TensorType) -> Result<Tensor> {
        self.expect('{')?;
        let mut builder = Tensor::builder(tensor_type.clone());
        if self.eat('}') {
            return builder.build();
        }
        let general = self.peek() == Some('{');
        let mapped: Vec<usize> = (0..tensor_type.rank())
            .filter(|&p| tensor_type.dimensions()[p].is_mapped())
            .collect();
        if !general && mapped.len() != 1 {
            return Err(self.error("labeled blocks require exactly one mapped dimension"));
        }
        loop {
            if general {
                let address = self.address(&tensor_type)?;
                self.expect(':')?;
                builder.cell(self.number()?, address);
            } else {
                self.labeled_block(&tensor_type, mapped[0], &mut builder)?;
            }
            if self.eat('}') {
                break;
            }
            self.expect(',')?;
        }
        builder.build()
    }

    /// `label:value` with the value a nested list over the indexed dimensions.
    fn labeled_block(
        &mut self,
        tensor_type: &TensorType,
        mapped: usize,
        builder: &mut TensorBuilder,
    ) -> Result<()> {
        let label = self.label()?;
        self.expect(':')?;
        let indexed: Vec<Dimension> = tensor_type
            .dimensions()
            .iter()
            .filter(|d| d.is_indexed())
            .cloned()
            .collect();
        let (sizes, values) = self.block(&indexed)?;
        check_sizes(tensor_type, &indexed, &sizes)?;
        let strides = strides(&sizes);
        for (offset, value) in values.into_iter().enumerate() {
            let mut labels = Vec::with_capacity(tensor_type.rank());
            let mut indexes = sizes
                .iter()
                .zip(&strides)
                .map(|(&size, &stride)| (offset / stride) % size);
            for p in 0..tensor_type.rank() {
                if p == mapped {
                    labels.push(Label::Mapped(label.clone()));
                } else {
                    labels.push(Label::Indexed(indexes.next().unwrap_or_default()));
                }
            }
            builder.cell(value, TensorAddress::from(labels));
        }
        Ok(())
    }

    /// `{dim:label,...}` naming every dimension once.
    fn address(&mut self, tensor_type: &TensorType) -> Result<TensorAddress> {
        self.expect('{')?;
        let mut labels: Vec<Option<Label>> = vec![None; tensor_type.rank()];
        if !self.eat('}') {
            loop {
                let start = self.position;
                let name = self.token();
                let Some(p) = tensor_type.index_of(name) else {
                    return Err(TensorError::Parse {
                        position: start,
                        message: format!("unknown dimension '{}'", name),
                    });
                };
                self.expect(':')?;
                let label = if tensor_type.dimensions()[p].is_mapped() {
                    Label::Mapped(self.label()?)
                } else {
                    Label::Indexed(self.index()?)
                };
                if labels[p].replace(label).is_some() {
                    return Err(TensorError::Parse {
                        position: start,
                        message: format!("dimension '{}' is labeled twice", name),
                    });
                }
                if self.eat('}') {
                    break;
                }
                self.expect(',')?;
            }
        }
        labels
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(TensorAddress::from)
            .ok_or_else(|| self.error("address does not label every dimension"))
    }
}

fn check_sizes(tensor_type: &TensorType, dims: &[Dimension], sizes: &[usize]) -> Result<()> {
    for (dim, &size) in dims.iter().zip(sizes) {
        if let Some(bound) = dim.size() {
            if bound != size {
                return Err(TensorError::InvalidAddress {
                    tensor_type: tensor_type.clone(),
                    reason: format!("dimension {} has {} values", dim, size),
                });
            }
        }
    }
    Ok(())
}

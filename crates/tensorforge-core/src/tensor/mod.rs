//! Tensor values and the elementary tensor operators.
//!
//! A [`Tensor`] is an immutable value: a [`TensorType`] plus cells. The
//! storage follows the type: a dense row-major array when every dimension
//! is indexed, an ordered map of addresses when every dimension is mapped,
//! and mapped keys selecting dense blocks otherwise.
//!
//! Every operator of the tensor algebra returns a new tensor:
//! [`join`](Tensor::join), [`reduce`](Tensor::reduce),
//! [`rename`](Tensor::rename), [`map`](Tensor::map) and
//! [`concat`](Tensor::concat). Tensors are created with
//! [`Tensor::builder`], [`Tensor::from_values`] or parsed from the literal
//! format with [`Tensor::from_literal`].

mod address;
mod aggregator;
mod builder;
mod concat;
mod join;
mod literal;
mod reduce;
mod rename;
mod storage;

#[cfg(test)]
mod tests;

use std::fmt;

pub use address::{Label, TensorAddress};
pub use aggregator::Aggregator;
pub use builder::TensorBuilder;
pub use storage::Cells;

use storage::{DenseBlock, Storage};

use crate::error::{Result, TensorError};
use crate::types::TensorType;

/// An immutable tensor value.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    tensor_type: TensorType,
    storage: Storage,
}

impl Tensor {
    pub(crate) fn from_parts(tensor_type: TensorType, storage: Storage) -> Self {
        Self {
            tensor_type,
            storage,
        }
    }

    /// Stores cells whose addresses are known to be valid for the type.
    pub(crate) fn from_cells(
        tensor_type: TensorType,
        cells: impl IntoIterator<Item = (TensorAddress, f64)>,
    ) -> Self {
        let storage = Storage::assemble(&tensor_type, cells);
        Self::from_parts(tensor_type, storage)
    }

    /// A rank-0 tensor.
    pub fn scalar(value: f64) -> Self {
        Self::from_parts(
            TensorType::scalar(),
            Storage::Dense(DenseBlock {
                sizes: Vec::new(),
                values: vec![value],
            }),
        )
    }

    pub fn builder(tensor_type: TensorType) -> TensorBuilder {
        TensorBuilder::new(tensor_type)
    }

    /// Creates a dense tensor from its cells in row-major order.
    ///
    /// Every dimension must be indexed with a bound size, and `values` must
    /// hold exactly one value per cell.
    pub fn from_values(tensor_type: TensorType, values: Vec<f64>) -> Result<Self> {
        let mut sizes = Vec::with_capacity(tensor_type.rank());
        for dim in tensor_type.dimensions() {
            match dim.size() {
                Some(size) => sizes.push(size),
                None => {
                    return Err(TensorError::InvalidAddress {
                        tensor_type: tensor_type.clone(),
                        reason: format!("dimension {} must be indexed with a bound size", dim),
                    })
                }
            }
        }
        let expected: usize = sizes.iter().product();
        if values.len() != expected {
            return Err(TensorError::InvalidAddress {
                tensor_type,
                reason: format!("expected {} values but got {}", expected, values.len()),
            });
        }
        Ok(Self::from_parts(
            tensor_type,
            Storage::Dense(DenseBlock { sizes, values }),
        ))
    }

    pub fn tensor_type(&self) -> &TensorType {
        &self.tensor_type
    }

    /// Iterates the cells of this tensor. Each call starts over.
    pub fn cells(&self) -> Cells<'_> {
        self.storage.cells()
    }

    /// The value at `address`, if the cell exists.
    pub fn cell(&self, address: &TensorAddress) -> Option<f64> {
        self.storage.cell(address)
    }

    /// The value at `address`; absent cells read as 0.
    pub fn get(&self, address: &TensorAddress) -> f64 {
        self.cell(address).unwrap_or(0.0)
    }

    /// Number of stored cells.
    pub fn size(&self) -> usize {
        self.storage.len()
    }

    /// Actual extent of an indexed dimension.
    pub fn extent(&self, dimension: &str) -> Option<usize> {
        let position = self.tensor_type.index_of(dimension)?;
        match &self.storage {
            Storage::Dense(block) => block.sizes.get(position).copied(),
            Storage::Sparse(_) => None,
            Storage::Mixed(mixed) => mixed
                .indexed
                .iter()
                .position(|&p| p == position)
                .map(|i| mixed.sizes[i]),
        }
    }

    /// The value of a rank-0 tensor.
    ///
    /// # Errors
    ///
    /// [`TensorError::NotScalar`] for any other rank.
    pub fn as_double(&self) -> Result<f64> {
        if !self.tensor_type.is_scalar() {
            return Err(TensorError::NotScalar(self.tensor_type.clone()));
        }
        Ok(self.cell(&TensorAddress::empty()).unwrap_or(0.0))
    }

    /// Whether this value may be bound where `declared` is expected.
    ///
    /// Beyond type assignability, every bound declared size must equal the
    /// actual extent of this value.
    pub fn is_assignable_to(&self, declared: &TensorType) -> bool {
        self.tensor_type.is_assignable_to(declared)
            && declared.dimensions().iter().all(|dim| match dim.size() {
                Some(size) => self.extent(dim.name()) == Some(size),
                None => true,
            })
    }

    pub fn sum(&self) -> Result<f64> {
        self.aggregate(Aggregator::Sum)
    }

    pub fn prod(&self) -> Result<f64> {
        self.aggregate(Aggregator::Prod)
    }

    pub fn max(&self) -> Result<f64> {
        self.aggregate(Aggregator::Max)
    }

    pub fn min(&self) -> Result<f64> {
        self.aggregate(Aggregator::Min)
    }

    pub fn avg(&self) -> Result<f64> {
        self.aggregate(Aggregator::Avg)
    }

    pub fn count(&self) -> Result<f64> {
        self.aggregate(Aggregator::Count)
    }

    /// Aggregates every cell into one value.
    pub fn aggregate(&self, aggregator: Aggregator) -> Result<f64> {
        let mut accumulator = aggregator.accumulator();
        for (_, value) in self.cells() {
            accumulator.add(value);
        }
        accumulator.finish()
    }

    /// Applies `f` to every cell; the type is unchanged.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Tensor {
        Self::from_parts(self.tensor_type.clone(), self.storage.map_values(f))
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl From<f64> for Tensor {
    fn from(value: f64) -> Self {
        Tensor::scalar(value)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        literal::write_literal(self, f)
    }
}

impl std::str::FromStr for Tensor {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self> {
        Tensor::from_literal(s)
    }
}

//! Cell-by-cell construction of tensors.

use super::address::{Label, TensorAddress};
use super::storage::Storage;
use super::Tensor;
use crate::error::{Result, TensorError};
use crate::types::{DimensionKind, TensorType};

/// Builds a [`Tensor`] from individually set cells.
///
/// ```
/// use tensorforge_core::{Label, Tensor, TensorType};
///
/// let tensor_type = TensorType::from_spec("tensor(x{},y[2])").unwrap();
/// let mut builder = Tensor::builder(tensor_type);
/// builder.cell(1.0, [Label::mapped("a"), Label::Indexed(0)]);
/// builder.cell(2.0, [Label::mapped("a"), Label::Indexed(1)]);
/// let tensor = builder.build().unwrap();
/// assert_eq!(tensor.sum().unwrap(), 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct TensorBuilder {
    tensor_type: TensorType,
    cells: Vec<(TensorAddress, f64)>,
}

impl TensorBuilder {
    pub fn new(tensor_type: TensorType) -> Self {
        Self {
            tensor_type,
            cells: Vec::new(),
        }
    }

    pub fn tensor_type(&self) -> &TensorType {
        &self.tensor_type
    }

    /// Sets the cell at `address`.
    pub fn cell(&mut self, value: f64, address: impl Into<TensorAddress>) -> &mut Self {
        self.cells.push((address.into(), value));
        self
    }

    /// Validates every address and builds the tensor.
    ///
    /// # Errors
    ///
    /// [`TensorError::InvalidAddress`] when an address has the wrong number
    /// of labels, a label of the wrong kind, or an index outside a bound
    /// size; [`TensorError::DuplicateAddress`] when an address is set twice.
    pub fn build(self) -> Result<Tensor> {
        for (address, _) in &self.cells {
            self.validate(address)?;
        }

        let mut addresses: Vec<&TensorAddress> = self.cells.iter().map(|(a, _)| a).collect();
        addresses.sort();
        if let Some(pair) = addresses.windows(2).find(|w| w[0] == w[1]) {
            return Err(TensorError::DuplicateAddress {
                tensor_type: self.tensor_type.clone(),
                address: pair[0].to_string(),
            });
        }

        let storage = Storage::assemble(&self.tensor_type, self.cells);
        Ok(Tensor::from_parts(self.tensor_type, storage))
    }

    fn validate(&self, address: &TensorAddress) -> Result<()> {
        let dims = self.tensor_type.dimensions();
        if address.len() != dims.len() {
            return Err(self.invalid(format!(
                "address {} has {} labels, expected {}",
                address,
                address.len(),
                dims.len()
            )));
        }
        for (dim, label) in dims.iter().zip(address.labels()) {
            match (dim.kind(), label) {
                (DimensionKind::Mapped, Label::Mapped(_)) => {}
                (DimensionKind::Indexed { size }, Label::Indexed(i)) => {
                    if let Some(size) = size {
                        if *i >= size {
                            return Err(self.invalid(format!(
                                "index {} is out of range for dimension {}",
                                i, dim
                            )));
                        }
                    }
                }
                (DimensionKind::Mapped, Label::Indexed(_)) => {
                    return Err(self.invalid(format!(
                        "mapped dimension '{}' requires a string label in {}",
                        dim.name(),
                        address
                    )));
                }
                (DimensionKind::Indexed { .. }, Label::Mapped(_)) => {
                    return Err(self.invalid(format!(
                        "indexed dimension '{}' requires an index in {}",
                        dim.name(),
                        address
                    )));
                }
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> TensorError {
        TensorError::InvalidAddress {
            tensor_type: self.tensor_type.clone(),
            reason,
        }
    }
}

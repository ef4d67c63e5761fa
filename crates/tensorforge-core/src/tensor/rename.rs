//! The rename operator.

use super::address::TensorAddress;
use super::storage::{strides, DenseBlock, Storage};
use super::Tensor;
use crate::error::Result;

impl Tensor {
    /// Renames dimension `from[i]` to `to[i]`; cell values are unchanged.
    pub fn rename<S: AsRef<str>, T: AsRef<str>>(&self, from: &[S], to: &[T]) -> Result<Tensor> {
        let result_type = self.tensor_type().rename(from, to)?;
        let source: Vec<usize> = result_type
            .dimension_names()
            .map(|name| {
                let original = to
                    .iter()
                    .position(|t| t.as_ref() == name)
                    .map_or(name, |i| from[i].as_ref());
                self.tensor_type().index_of(original).unwrap_or_default()
            })
            .collect();

        if source.iter().enumerate().all(|(i, &p)| i == p) {
            return Ok(Tensor::from_parts(result_type, self.storage().clone()));
        }

        let storage = match self.storage() {
            Storage::Dense(block) => Storage::Dense(permute_dense(block, &source)),
            storage => {
                let cells: Vec<(TensorAddress, f64)> = self
                    .cells()
                    .map(|(address, value)| {
                        let permuted = source
                            .iter()
                            .map(|&p| address.labels()[p].clone())
                            .collect();
                        (permuted, value)
                    })
                    .collect();
                let mut permuted = Storage::assemble(&result_type, cells);
                // Extents of an empty tensor cannot be recovered from its cells.
                if let (Storage::Mixed(from), Storage::Mixed(to)) = (storage, &mut permuted) {
                    to.sizes = to
                        .indexed
                        .iter()
                        .map(|&q| {
                            let p = source[q];
                            from.indexed
                                .iter()
                                .position(|&i| i == p)
                                .map_or(0, |i| from.sizes[i])
                        })
                        .collect();
                }
                permuted
            }
        };
        Ok(Tensor::from_parts(result_type, storage))
    }
}

/// Reorders the dimensions of a dense block: output dimension `i` is
/// dimension `source[i]` of `block`.
fn permute_dense(block: &DenseBlock, source: &[usize]) -> DenseBlock {
    let sizes: Vec<usize> = source.iter().map(|&p| block.sizes[p]).collect();
    let from_strides = strides(&block.sizes);
    let steps: Vec<usize> = source.iter().map(|&p| from_strides[p]).collect();
    let to_strides = strides(&sizes);
    let values = (0..block.values.len())
        .map(|offset| {
            let from: usize = sizes
                .iter()
                .zip(&to_strides)
                .zip(&steps)
                .map(|((&size, &stride), &step)| (offset / stride) % size * step)
                .sum();
            block.values[from]
        })
        .collect();
    DenseBlock { sizes, values }
}

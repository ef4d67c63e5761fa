//! The join operator.

use std::collections::HashMap;

use super::address::{Label, TensorAddress};
use super::storage::{strides, DenseBlock, Storage};
use super::Tensor;
use crate::error::Result;
use crate::types::TensorType;

impl Tensor {
    /// Joins two tensors cell by cell with `f`.
    ///
    /// The result has the union of both dimension sets. Cells are combined
    /// where their labels agree on the shared dimensions; every other
    /// dimension forms a Cartesian product. Along a shared indexed
    /// dimension the result covers the smaller of the two extents.
    ///
    /// ```
    /// use tensorforge_core::Tensor;
    ///
    /// let x: Tensor = "tensor(x[3]):[1.0,2.0,3.0]".parse().unwrap();
    /// let y: Tensor = "tensor(y[2]):[10.0,20.0]".parse().unwrap();
    /// let product = x.join(&y, |a, b| a * b).unwrap();
    /// assert_eq!(product.tensor_type().to_string(), "tensor(x[3],y[2])");
    /// assert_eq!(product.sum().unwrap(), 180.0);
    /// ```
    pub fn join(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Result<Tensor> {
        let merged = self.tensor_type().join(other.tensor_type())?;
        let result_type = settle_extents(merged, &[self, other]);
        match (self.storage(), other.storage()) {
            (Storage::Dense(a), Storage::Dense(b)) => {
                Ok(dense_join(result_type, (self, a), (other, b), f))
            }
            _ => Ok(generic_join(result_type, self, other, f)),
        }
    }
}

/// Unbinds each bound indexed dimension of `merged` whose actual extent,
/// the smallest among the operands carrying it, differs from the bound.
pub(super) fn settle_extents(merged: TensorType, operands: &[&Tensor]) -> TensorType {
    let mut result = merged.clone();
    for dim in merged.dimensions() {
        let Some(size) = dim.size() else { continue };
        let extent = operands
            .iter()
            .filter_map(|t| t.extent(dim.name()))
            .min();
        if extent.is_some_and(|e| e != size) {
            result = result.with_size(dim.name(), None);
        }
    }
    result
}

/// Walks the result positions in row-major order, advancing each operand
/// by its own stride along every result dimension. Dimensions an operand
/// lacks have stride 0, so shared dimensions move in lock-step and the
/// others nest.
fn dense_join(
    result_type: TensorType,
    (left, a): (&Tensor, &DenseBlock),
    (right, b): (&Tensor, &DenseBlock),
    f: impl Fn(f64, f64) -> f64,
) -> Tensor {
    let dims = result_type.dimensions();
    let rank = dims.len();
    let (a_strides, b_strides) = (strides(&a.sizes), strides(&b.sizes));

    let mut sizes = Vec::with_capacity(rank);
    let mut sa = vec![0usize; rank];
    let mut sb = vec![0usize; rank];
    for (d, dim) in dims.iter().enumerate() {
        let pa = left.tensor_type().index_of(dim.name());
        let pb = right.tensor_type().index_of(dim.name());
        let extent = pa
            .map(|p| a.sizes[p])
            .into_iter()
            .chain(pb.map(|p| b.sizes[p]))
            .min()
            .unwrap_or(0);
        sizes.push(extent);
        if let Some(p) = pa {
            sa[d] = a_strides[p];
        }
        if let Some(p) = pb {
            sb[d] = b_strides[p];
        }
    }

    let len: usize = sizes.iter().product();
    let mut values = Vec::with_capacity(len);
    if len > 0 {
        let mut index = vec![0usize; rank];
        let (mut ia, mut ib) = (0usize, 0usize);
        'cells: loop {
            values.push(f(a.values[ia], b.values[ib]));
            let mut d = rank;
            loop {
                if d == 0 {
                    break 'cells;
                }
                d -= 1;
                index[d] += 1;
                ia += sa[d];
                ib += sb[d];
                if index[d] < sizes[d] {
                    break;
                }
                ia -= sa[d] * sizes[d];
                ib -= sb[d] * sizes[d];
                index[d] = 0;
            }
        }
    }

    Tensor::from_parts(result_type, Storage::Dense(DenseBlock { sizes, values }))
}

#[derive(Clone, Copy)]
enum Source {
    Left(usize),
    Right(usize),
}

/// Hash join on the labels of the shared dimensions.
fn generic_join(
    result_type: TensorType,
    left: &Tensor,
    right: &Tensor,
    f: impl Fn(f64, f64) -> f64,
) -> Tensor {
    let common: Vec<(usize, usize)> = left
        .tensor_type()
        .dimension_names()
        .enumerate()
        .filter_map(|(pa, name)| right.tensor_type().index_of(name).map(|pb| (pa, pb)))
        .collect();
    let sources: Vec<Source> = result_type
        .dimension_names()
        .map(|name| match left.tensor_type().index_of(name) {
            Some(p) => Source::Left(p),
            None => Source::Right(right.tensor_type().index_of(name).unwrap_or_default()),
        })
        .collect();

    let mut index: HashMap<Vec<Label>, Vec<(TensorAddress, f64)>> = HashMap::new();
    for (address, value) in right.cells() {
        let key = common
            .iter()
            .map(|&(_, pb)| address.labels()[pb].clone())
            .collect();
        index.entry(key).or_default().push((address, value));
    }

    let mut cells = Vec::new();
    for (a_address, a_value) in left.cells() {
        let key: Vec<Label> = common
            .iter()
            .map(|&(pa, _)| a_address.labels()[pa].clone())
            .collect();
        let Some(matches) = index.get(&key) else {
            continue;
        };
        for (b_address, b_value) in matches {
            let address = sources
                .iter()
                .map(|source| match *source {
                    Source::Left(p) => a_address.labels()[p].clone(),
                    Source::Right(p) => b_address.labels()[p].clone(),
                })
                .collect();
            cells.push((address, f(a_value, *b_value)));
        }
    }
    Tensor::from_cells(result_type, cells)
}

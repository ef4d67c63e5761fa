//! The concat operator.

use std::collections::{BTreeMap, HashMap};

use super::address::{Label, TensorAddress};
use super::join::settle_extents;
use super::Tensor;
use crate::error::Result;
use crate::types::TensorType;

/// Cells of one operand grouped by their labels outside the concat
/// dimension.
struct Slices {
    rest_type: TensorType,
    extent: usize,
    groups: BTreeMap<TensorAddress, Vec<(usize, f64)>>,
}

impl Slices {
    fn of(tensor: &Tensor, dimension: &str) -> Self {
        let position = tensor.tensor_type().index_of(dimension);
        let mut groups: BTreeMap<TensorAddress, Vec<(usize, f64)>> = BTreeMap::new();
        for (address, value) in tensor.cells() {
            let mut rest = TensorAddress::empty();
            let mut index = 0;
            for (p, label) in address.labels().iter().enumerate() {
                if Some(p) == position {
                    index = label.as_index().unwrap_or_default();
                } else {
                    rest.push(label.clone());
                }
            }
            groups.entry(rest).or_default().push((index, value));
        }
        Self {
            rest_type: tensor.tensor_type().without(dimension),
            extent: tensor.extent(dimension).unwrap_or(1),
            groups,
        }
    }
}

impl Tensor {
    /// Concatenates two tensors along `dimension`.
    ///
    /// An operand without the dimension counts as extent 1 along it. The
    /// remaining dimensions are matched as in [`join`](Tensor::join).
    pub fn concat(&self, other: &Tensor, dimension: &str) -> Result<Tensor> {
        let merged = self.tensor_type().concat(other.tensor_type(), dimension)?;
        let (left, right) = (Slices::of(self, dimension), Slices::of(other, dimension));
        let concat_size = merged
            .dimension(dimension)
            .and_then(|d| d.size())
            .filter(|&size| size == left.extent + right.extent);
        let result_type =
            settle_extents(merged, &[self, other]).with_size(dimension, concat_size);

        let rest_type = result_type.without(dimension);
        let concat_position = result_type.index_of(dimension).unwrap_or_default();
        let common: Vec<(usize, usize)> = left
            .rest_type
            .dimension_names()
            .enumerate()
            .filter_map(|(pa, name)| right.rest_type.index_of(name).map(|pb| (pa, pb)))
            .collect();

        let mut index: HashMap<Vec<Label>, Vec<(&TensorAddress, &Vec<(usize, f64)>)>> =
            HashMap::new();
        for (rest, slice) in &right.groups {
            let key = common.iter().map(|&(_, pb)| rest.labels()[pb].clone()).collect();
            index.entry(key).or_default().push((rest, slice));
        }

        let mut cells = Vec::new();
        for (a_rest, a_slice) in &left.groups {
            let key: Vec<Label> = common
                .iter()
                .map(|&(pa, _)| a_rest.labels()[pa].clone())
                .collect();
            let Some(matches) = index.get(&key) else {
                continue;
            };
            for (b_rest, b_slice) in matches {
                let rest: Vec<Label> = rest_type
                    .dimension_names()
                    .map(|name| match left.rest_type.index_of(name) {
                        Some(p) => a_rest.labels()[p].clone(),
                        None => {
                            let p = right.rest_type.index_of(name).unwrap_or_default();
                            b_rest.labels()[p].clone()
                        }
                    })
                    .collect();
                let shifted = b_slice.iter().map(|&(i, v)| (i + left.extent, v));
                for (i, value) in a_slice.iter().copied().chain(shifted) {
                    let mut labels = rest.clone();
                    labels.insert(concat_position, Label::Indexed(i));
                    cells.push((TensorAddress::from(labels), value));
                }
            }
        }
        Ok(Tensor::from_cells(result_type, cells))
    }
}

//! The reduce operator.

use std::collections::BTreeMap;

use super::address::{Label, TensorAddress};
use super::aggregator::{Accumulator, Aggregator};
use super::storage::{strides, DenseBlock, Storage};
use super::Tensor;
use crate::error::Result;

impl Tensor {
    /// Aggregates away the named dimensions, or all of them when none are
    /// named.
    ///
    /// Output cells are accumulated in storage order. An output cell that
    /// receives no input cells takes the identity of `sum`, `prod` and
    /// `count` and fails for the other aggregators.
    pub fn reduce<S: AsRef<str>>(&self, aggregator: Aggregator, dimensions: &[S]) -> Result<Tensor> {
        let result_type = self.tensor_type().reduce(dimensions)?;
        let kept: Vec<usize> = result_type
            .dimension_names()
            .filter_map(|name| self.tensor_type().index_of(name))
            .collect();

        if result_type.is_dense() {
            let sizes: Vec<usize> = result_type
                .dimension_names()
                .map(|name| self.extent(name).unwrap_or(0))
                .collect();
            let out_strides = strides(&sizes);
            let mut accumulators: Vec<Accumulator> =
                vec![aggregator.accumulator(); sizes.iter().product()];
            for (address, value) in self.cells() {
                let offset: usize = kept
                    .iter()
                    .zip(&out_strides)
                    .map(|(&p, &stride)| {
                        address.labels()[p].as_index().unwrap_or_default() * stride
                    })
                    .sum();
                if let Some(accumulator) = accumulators.get_mut(offset) {
                    accumulator.add(value);
                }
            }
            let values = accumulators
                .iter()
                .map(Accumulator::finish)
                .collect::<Result<Vec<f64>>>()?;
            return Ok(Tensor::from_parts(
                result_type,
                Storage::Dense(DenseBlock { sizes, values }),
            ));
        }

        let mut groups: BTreeMap<TensorAddress, Accumulator> = BTreeMap::new();
        for (address, value) in self.cells() {
            let key: TensorAddress = kept
                .iter()
                .map(|&p| address.labels()[p].clone())
                .collect::<Vec<Label>>()
                .into();
            groups
                .entry(key)
                .or_insert_with(|| aggregator.accumulator())
                .add(value);
        }
        let cells = groups
            .into_iter()
            .map(|(address, accumulator)| Ok((address, accumulator.finish()?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::from_cells(result_type, cells))
    }
}

//! Cell storage layouts and cell iteration.

use std::collections::btree_map;
use std::collections::BTreeMap;

use super::address::{Label, TensorAddress};
use crate::types::TensorType;

/// Cell storage of a tensor, chosen from the kinds of its dimensions.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Storage {
    /// All dimensions indexed (scalars included): every cell is stored.
    Dense(DenseBlock),
    /// All dimensions mapped: only present cells are stored.
    Sparse(BTreeMap<TensorAddress, f64>),
    /// Mapped labels select a dense block over the indexed dimensions.
    Mixed(MixedBlocks),
}

/// A row-major block of cells over indexed dimensions.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DenseBlock {
    pub(crate) sizes: Vec<usize>,
    pub(crate) values: Vec<f64>,
}

impl DenseBlock {
    pub(crate) fn zeros(sizes: Vec<usize>) -> Self {
        let len = sizes.iter().product();
        Self {
            sizes,
            values: vec![0.0; len],
        }
    }

    pub(crate) fn offset(&self, indexes: impl Iterator<Item = usize>) -> Option<usize> {
        let mut offset = 0;
        for (size, index) in self.sizes.iter().zip(indexes) {
            if index >= *size {
                return None;
            }
            offset = offset * size + index;
        }
        Some(offset)
    }
}

/// Row-major strides of a block with the given sizes.
pub(crate) fn strides(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; sizes.len()];
    for i in (0..sizes.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * sizes[i + 1];
    }
    strides
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MixedBlocks {
    /// Positions of the mapped dimensions in the type.
    pub(crate) mapped: Vec<usize>,
    /// Positions of the indexed dimensions in the type.
    pub(crate) indexed: Vec<usize>,
    /// Extents of the indexed dimensions.
    pub(crate) sizes: Vec<usize>,
    pub(crate) blocks: BTreeMap<Vec<String>, Vec<f64>>,
}

impl MixedBlocks {
    fn block_len(&self) -> usize {
        self.sizes.iter().product()
    }

    fn split(&self, address: &TensorAddress) -> Option<(Vec<String>, usize)> {
        let key = self
            .mapped
            .iter()
            .map(|&p| address.label(p).and_then(Label::as_str).map(str::to_string))
            .collect::<Option<Vec<_>>>()?;
        let mut offset = 0;
        for (&p, &size) in self.indexed.iter().zip(&self.sizes) {
            let index = address.label(p)?.as_index()?;
            if index >= size {
                return None;
            }
            offset = offset * size + index;
        }
        Some((key, offset))
    }

    fn address(&self, key: &[String], offset: usize, strides: &[usize]) -> TensorAddress {
        let mut labels = vec![Label::Indexed(0); self.mapped.len() + self.indexed.len()];
        for (&p, label) in self.mapped.iter().zip(key) {
            labels[p] = Label::Mapped(label.clone());
        }
        for ((&p, &size), &stride) in self.indexed.iter().zip(&self.sizes).zip(strides) {
            labels[p] = Label::Indexed((offset / stride) % size);
        }
        TensorAddress::from(labels)
    }
}

impl Storage {
    /// Stores `cells` under `tensor_type`.
    ///
    /// Addresses must already be valid for the type. Unbound indexed
    /// dimensions take their extent from the largest index present; a
    /// later cell with an address seen before replaces the earlier one.
    pub(crate) fn assemble(
        tensor_type: &TensorType,
        cells: impl IntoIterator<Item = (TensorAddress, f64)>,
    ) -> Storage {
        let dims = tensor_type.dimensions();
        if tensor_type.is_dense() {
            let cells: Vec<_> = cells.into_iter().collect();
            let sizes = extents(tensor_type, (0..dims.len()).collect(), &cells);
            let mut block = DenseBlock::zeros(sizes);
            for (address, value) in cells {
                let indexes = address.labels().iter().filter_map(Label::as_index);
                if let Some(offset) = block.offset(indexes) {
                    block.values[offset] = value;
                }
            }
            Storage::Dense(block)
        } else if tensor_type.is_sparse() {
            Storage::Sparse(cells.into_iter().collect())
        } else {
            let cells: Vec<_> = cells.into_iter().collect();
            let (mapped, indexed): (Vec<usize>, Vec<usize>) =
                (0..dims.len()).partition(|&p| dims[p].is_mapped());
            let sizes = extents(tensor_type, indexed.clone(), &cells);
            let mut mixed = MixedBlocks {
                mapped,
                indexed,
                sizes,
                blocks: BTreeMap::new(),
            };
            let len = mixed.block_len();
            for (address, value) in cells {
                if let Some((key, offset)) = mixed.split(&address) {
                    mixed.blocks.entry(key).or_insert_with(|| vec![0.0; len])[offset] = value;
                }
            }
            Storage::Mixed(mixed)
        }
    }

    pub(crate) fn cell(&self, address: &TensorAddress) -> Option<f64> {
        match self {
            Storage::Dense(block) => {
                if address.len() != block.sizes.len() {
                    return None;
                }
                let indexes = address
                    .labels()
                    .iter()
                    .map(|l| l.as_index())
                    .collect::<Option<Vec<_>>>()?;
                block
                    .offset(indexes.into_iter())
                    .map(|offset| block.values[offset])
            }
            Storage::Sparse(map) => map.get(address).copied(),
            Storage::Mixed(mixed) => {
                if address.len() != mixed.mapped.len() + mixed.indexed.len() {
                    return None;
                }
                let (key, offset) = mixed.split(address)?;
                mixed.blocks.get(&key).map(|block| block[offset])
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Storage::Dense(block) => block.values.len(),
            Storage::Sparse(map) => map.len(),
            Storage::Mixed(mixed) => mixed.blocks.len() * mixed.block_len(),
        }
    }

    pub(crate) fn map_values(&self, f: impl Fn(f64) -> f64) -> Storage {
        match self {
            Storage::Dense(block) => Storage::Dense(DenseBlock {
                sizes: block.sizes.clone(),
                values: block.values.iter().map(|&v| f(v)).collect(),
            }),
            Storage::Sparse(map) => {
                Storage::Sparse(map.iter().map(|(a, &v)| (a.clone(), f(v))).collect())
            }
            Storage::Mixed(mixed) => Storage::Mixed(MixedBlocks {
                mapped: mixed.mapped.clone(),
                indexed: mixed.indexed.clone(),
                sizes: mixed.sizes.clone(),
                blocks: mixed
                    .blocks
                    .iter()
                    .map(|(k, block)| (k.clone(), block.iter().map(|&v| f(v)).collect()))
                    .collect(),
            }),
        }
    }

    pub(crate) fn cells(&self) -> Cells<'_> {
        let inner = match self {
            Storage::Dense(block) => CellsInner::Dense {
                sizes: &block.sizes,
                strides: strides(&block.sizes),
                values: &block.values,
                next: 0,
            },
            Storage::Sparse(map) => CellsInner::Sparse(map.iter()),
            Storage::Mixed(mixed) => CellsInner::Mixed {
                mixed,
                strides: strides(&mixed.sizes),
                blocks: mixed.blocks.iter(),
                current: None,
                next: 0,
            },
        };
        Cells { inner }
    }
}

/// Extent of each indexed dimension at `positions`: the bound size, or one
/// past the largest index among `cells`.
fn extents(
    tensor_type: &TensorType,
    positions: Vec<usize>,
    cells: &[(TensorAddress, f64)],
) -> Vec<usize> {
    let dims = tensor_type.dimensions();
    positions
        .into_iter()
        .map(|p| match dims[p].size() {
            Some(size) => size,
            None => cells
                .iter()
                .filter_map(|(a, _)| a.label(p).and_then(Label::as_index))
                .map(|i| i + 1)
                .max()
                .unwrap_or(0),
        })
        .collect()
}

/// Iterator over the cells of a tensor in storage order.
///
/// Created by [`Tensor::cells`](crate::Tensor::cells). Dense tensors yield
/// every cell of their extent in row-major order; sparse tensors yield their
/// cells in address order; mixed tensors yield block by block.
pub struct Cells<'a> {
    inner: CellsInner<'a>,
}

enum CellsInner<'a> {
    Dense {
        sizes: &'a [usize],
        strides: Vec<usize>,
        values: &'a [f64],
        next: usize,
    },
    Sparse(btree_map::Iter<'a, TensorAddress, f64>),
    Mixed {
        mixed: &'a MixedBlocks,
        strides: Vec<usize>,
        blocks: btree_map::Iter<'a, Vec<String>, Vec<f64>>,
        current: Option<(&'a Vec<String>, &'a Vec<f64>)>,
        next: usize,
    },
}

impl Iterator for Cells<'_> {
    type Item = (TensorAddress, f64);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            CellsInner::Dense {
                sizes,
                strides,
                values,
                next,
            } => {
                let value = *values.get(*next)?;
                let address = sizes
                    .iter()
                    .zip(strides.iter())
                    .map(|(&size, &stride)| Label::Indexed((*next / stride) % size))
                    .collect();
                *next += 1;
                Some((address, value))
            }
            CellsInner::Sparse(iter) => iter.next().map(|(a, &v)| (a.clone(), v)),
            CellsInner::Mixed {
                mixed,
                strides,
                blocks,
                current,
                next,
            } => loop {
                if let Some((key, block)) = *current {
                    if let Some(&value) = block.get(*next) {
                        let address = mixed.address(key, *next, strides);
                        *next += 1;
                        return Some((address, value));
                    }
                }
                *current = Some(blocks.next()?);
                *next = 0;
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            CellsInner::Dense { values, next, .. } => {
                let rest = values.len() - *next;
                (rest, Some(rest))
            }
            CellsInner::Sparse(iter) => iter.size_hint(),
            CellsInner::Mixed { .. } => (0, None),
        }
    }
}

//! TensorForge Core - tensor types and tensor values
//!
//! This crate provides the value layer of TensorForge:
//! - [`TensorType`] with the type rules of every tensor operator
//! - [`Tensor`] with dense, sparse and mixed storage
//! - The elementary operators join, reduce, rename, map and concat
//! - The tensor literal interchange format

pub mod error;
pub mod tensor;
pub mod types;

pub use error::{Result, TensorError};
pub use tensor::{Aggregator, Cells, Label, Tensor, TensorAddress, TensorBuilder};
pub use types::{Dimension, DimensionKind, TensorType, TensorTypeBuilder};

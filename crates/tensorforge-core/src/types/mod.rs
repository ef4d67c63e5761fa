//! Tensor types: named dimensions, their kinds, and the result types of the
//! tensor algebra.
//!
//! A type is a set of dimensions sorted by name. A dimension is either
//! *mapped* (sparse, string labels) or *indexed* (dense, integer labels
//! `0..size`). An indexed dimension may leave its size unbound, in which
//! case the size is taken from the actual values at evaluation time.

mod dimension;
mod spec;
mod tensor_type;


pub use dimension::{Dimension, DimensionKind};
pub use tensor_type::{TensorType, TensorTypeBuilder};

pub(crate) use spec::{is_identifier, parse_type_prefix};

//! Native compilation of tree ensembles via Cranelift.
//!
//! A [`CompactForest`](crate::gbdt::CompactForest) compiles to one function
//! `extern "C" fn(features: *const f64) -> f64`. Every branch node becomes a
//! feature load, a float comparison and a conditional jump; every leaf jumps
//! to its tree's exit block carrying the leaf value, and tree values are
//! added in table order.


mod compiler;

pub use compiler::{JitError, NativeForest};

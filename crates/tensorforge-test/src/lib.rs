//! Shared test fixtures for TensorForge crates.
//!
//! - [`ensemble`] - tree ensemble models, fixed and random
//! - [`mnist`] - dense network models with reference forward passes
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! tensorforge-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use tensorforge_test::ensemble::{xgboost_model, XGBOOST_SUM};
//! use tensorforge_test::mnist::{softmax_model, zero_input};
//! ```

pub mod ensemble;
pub mod mnist;

pub use ensemble::{xgboost_model, XGBOOST_SUM};
pub use mnist::{softmax_model, two_layer_model, SOFTMAX_ZERO_SUM};

pub use fnspace_sys as sys;

/// Spaces and vectors whose element type is only known at runtime
pub mod dynamic;

/// The crate wide error type
pub mod error;

/// Per device implementations of the elementwise and reduction kernels
pub mod kernels;

/// Broadcasting of scalar parameters and normalization of index expressions
pub mod normalize;

/// Free elementwise operations on vectors
pub mod ops;

/// Python style slices
pub mod slice;

/// The `F^n` vector space
pub mod space;

/// Elements of a vector space
pub mod vector;

/// Evaluation of point functions on arrays and meshgrids
pub mod vectorization;

pub use dynamic::{DynBuffer, DynSpace, DynVector};
pub use error::{Error, Result};
pub use space::{FnSpace, RnSpace};
pub use vector::Vector;

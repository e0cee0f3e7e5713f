/// Selection of the compute backend and the process-wide capability probe
pub mod backend;

/// Owned and borrowed element buffers living on a device
pub mod buffer;

/// The device abstraction and its CPU and CUDA implementations
pub mod device;

/// Runtime element type tags
pub mod dtype;

/// Scalar types that can be stored on a device
pub mod element;

pub mod ptr;

pub use backend::Backend;
pub use buffer::Buffer;
pub use dtype::DType;
pub use element::Element;

use fnspace_sys::{backend::Backend, device::Device, dtype::UnknownDType, DType};

use crate::{normalize::NormalizeError, vectorization::VectorizationError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dimension must be positive, got {0}")]
    InvalidDimension(usize),
    #[error(transparent)]
    UnknownDType(#[from] UnknownDType),
    #[error("dtype mismatch: expected {expected}, found {found}")]
    DTypeMismatch { expected: DType, found: DType },
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("{found} is not an element of {space}")]
    NotInSpace { space: String, found: String },
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: isize, len: usize },
    #[error("slice step cannot be zero")]
    ZeroStep,
    #[error("value {value} cannot be represented as {dtype}")]
    Conversion { value: String, dtype: DType },
    #[error("null pointer")]
    NullPointer,
    #[error("operands live on different devices")]
    DeviceMismatch,
    #[error("backend {0} is disabled by FNSPACE_BACKEND")]
    BackendDisabled(Backend),
    #[error("backend {backend} is not available: {source}")]
    BackendUnavailable {
        backend: Backend,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Vectorization(#[from] VectorizationError),
    #[error("device error: {0}")]
    Device(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a device error unchanged. Use [`Error::downcast_device`] to recover it.
    pub fn device<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Error::Device(Box::new(err))
    }

    /// Fails when `D`'s backend was turned off through the environment.
    pub(crate) fn check_enabled<D: Device>() -> Result<()> {
        if D::BACKEND.is_enabled() {
            Ok(())
        } else {
            tracing::debug!(backend = %D::BACKEND, "backend disabled by environment");
            Err(Error::BackendDisabled(D::BACKEND))
        }
    }

    /// The default instance of `D` could not be created.
    pub fn unavailable<D: Device>(err: D::Error) -> Self {
        Error::BackendUnavailable {
            backend: D::BACKEND,
            source: Box::new(err),
        }
    }

    pub fn downcast_device<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Error::Device(err) | Error::BackendUnavailable { source: err, .. } => {
                err.downcast_ref()
            }
            _ => None,
        }
    }
}

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use cudarc::driver::{result, sys::CUdeviceptr, CudaDevice, DriverError};
use parking_lot::Mutex;

use crate::{backend::Backend, element::Element, ptr::NonNull};

use super::{DefaultDevice, Device, DevicePtr};

/// Device for CUDA enabled GPUs, bound to a single ordinal.
///
/// All operations bind the device context to the calling thread before
/// touching device memory and are synchronous.
#[derive(Clone)]
pub struct Cuda {
    dev: Arc<CudaDevice>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CudaError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("cuda is not available: {0}")]
    Unavailable(String),
    #[error("failed to compile kernel module {module}: {msg}")]
    Compile { module: String, msg: String },
    #[error("kernel function {0} not found")]
    FuncNotFound(String),
    #[error("cublas error: {0}")]
    Blas(String),
}

/// A raw device address tagged with its element type.
pub struct CudaPtr<T>(*mut T);

impl<T> Clone for CudaPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CudaPtr<T> {}

impl<T> fmt::Debug for CudaPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CudaPtr({:#x})", self.addr())
    }
}

impl<T> CudaPtr<T> {
    pub fn addr(self) -> CUdeviceptr {
        self.0 as usize as CUdeviceptr
    }
}

impl<T> DevicePtr<T> for CudaPtr<T> {
    fn as_raw(self) -> *mut T {
        self.0
    }

    fn from_raw(ptr: *mut T) -> Self {
        CudaPtr(ptr)
    }
}

fn d_ptr<T>(ptr: NonNull<T, Cuda>) -> CUdeviceptr {
    ptr.as_ptr().addr()
}

/// One driver handle per ordinal, shared by every [`Cuda`] for that ordinal.
///
/// Compiled kernel modules are attached to the handle, so handing out a fresh
/// `CudaDevice` per call would leave later handles without them.
static DEVICES: OnceLock<Mutex<HashMap<usize, Arc<CudaDevice>>>> = OnceLock::new();

fn devices() -> &'static Mutex<HashMap<usize, Arc<CudaDevice>>> {
    DEVICES.get_or_init(|| Mutex::new(HashMap::new()))
}

impl Cuda {
    /// Opens the device at `ordinal`, reusing the handle if it was opened before.
    pub fn new(ordinal: usize) -> Result<Self, CudaError> {
        let mut map = devices().lock();
        if let Some(dev) = map.get(&ordinal) {
            return Ok(Self {
                dev: Arc::clone(dev),
            });
        }
        let dev = CudaDevice::new(ordinal)?;
        tracing::debug!(ordinal, name = ?dev.name().ok(), "initialised cuda device");
        map.insert(ordinal, Arc::clone(&dev));
        Ok(Self { dev })
    }

    pub fn ordinal(&self) -> usize {
        self.dev.ordinal()
    }

    pub fn cuda_device(&self) -> &Arc<CudaDevice> {
        &self.dev
    }

    pub fn synchronize(&self) -> Result<(), CudaError> {
        self.dev.synchronize()?;
        Ok(())
    }

    fn bind(&self) -> Result<(), CudaError> {
        self.dev.bind_to_thread()?;
        Ok(())
    }
}

impl fmt::Debug for Cuda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cuda")
            .field("ordinal", &self.ordinal())
            .finish()
    }
}

impl PartialEq for Cuda {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal() == other.ordinal()
    }
}

impl Device for Cuda {
    type Ptr<T> = CudaPtr<T>;
    type Error = CudaError;

    const NAME: &'static str = "Cuda";
    const BACKEND: Backend = Backend::Cuda;

    fn allocate_zeroed<T: Element>(&self, len: usize) -> Result<NonNull<T, Self>, CudaError> {
        if len == 0 {
            return Ok(NonNull::dangling());
        }
        let bytes = len * std::mem::size_of::<T>();
        self.bind()?;
        tracing::trace!(len, bytes, dtype = %T::DTYPE, "cuda allocation");

        // Safety: context is bound and the size is non-zero
        unsafe {
            let addr = result::malloc_sync(bytes)?;
            if let Err(err) = result::memset_d8_sync(addr, 0, bytes) {
                let _ = result::free_sync(addr);
                return Err(err.into());
            }
            NonNull::new(CudaPtr(addr as usize as *mut T)).ok_or_else(|| {
                CudaError::Unavailable("driver returned a null allocation".to_owned())
            })
        }
    }

    unsafe fn deallocate<T: Element>(&self, ptr: NonNull<T, Self>, len: usize) {
        if len == 0 {
            return;
        }
        let res = self
            .bind()
            .and_then(|()| result::free_sync(d_ptr(ptr)).map_err(CudaError::from));
        if let Err(err) = res {
            tracing::error!(%err, "failed to free cuda allocation");
        }
    }

    unsafe fn copy_from_host<T: Element>(
        &self,
        from: &[T],
        to: NonNull<T, Self>,
    ) -> Result<(), CudaError> {
        if from.is_empty() {
            return Ok(());
        }
        self.bind()?;
        result::memcpy_htod_sync(d_ptr(to), from)?;
        Ok(())
    }

    unsafe fn copy_to_host<T: Element>(
        &self,
        from: NonNull<T, Self>,
        to: &mut [T],
    ) -> Result<(), CudaError> {
        if to.is_empty() {
            return Ok(());
        }
        self.bind()?;
        result::memcpy_dtoh_sync(to, d_ptr(from))?;
        Ok(())
    }

    unsafe fn copy<T: Element>(
        &self,
        from: NonNull<T, Self>,
        to: NonNull<T, Self>,
        len: usize,
    ) -> Result<(), CudaError> {
        if len == 0 {
            return Ok(());
        }
        self.bind()?;
        result::memcpy_dtod_sync(d_ptr(to), d_ptr(from), len * std::mem::size_of::<T>())?;
        Ok(())
    }
}

static PROBE: OnceLock<Result<Cuda, String>> = OnceLock::new();

/// Checks once per process whether a usable CUDA device is present.
///
/// The probe opens device 0 and performs a tiny allocation. The outcome,
/// success or failure, is cached for the rest of the process.
pub fn probe() -> Result<Cuda, CudaError> {
    PROBE
        .get_or_init(|| {
            let res = Cuda::new(0).and_then(|cuda| {
                let ptr = cuda.allocate_zeroed::<f32>(1)?;
                unsafe { cuda.deallocate(ptr, 1) };
                Ok(cuda)
            });
            match res {
                Ok(cuda) => {
                    tracing::info!(ordinal = cuda.ordinal(), "cuda backend available");
                    Ok(cuda)
                }
                Err(err) => {
                    tracing::warn!(%err, "cuda backend unavailable");
                    Err(err.to_string())
                }
            }
        })
        .clone()
        .map_err(CudaError::Unavailable)
}

impl DefaultDevice for Cuda {
    fn default_device() -> Result<Self, CudaError> {
        probe()
    }
}

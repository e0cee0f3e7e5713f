//! Elementwise kernels compiled at runtime with NVRTC, one module per dtype,
//! and cuBLAS for the floating point inner product and norm.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use cudarc::{
    cublas::{sys as cublas_sys, CudaBlas},
    driver::{CudaFunction, DeviceRepr, LaunchAsync, LaunchConfig},
    nvrtc::compile_ptx,
};
use fnspace_sys::{
    device::{
        cuda::{Cuda, CudaError, CudaPtr},
        DevicePtr,
    },
    Buffer, DType, Element,
};
use parking_lot::Mutex;

use super::{InnerProduct, VectorKernels};

const BLOCK: u32 = 256;
const MAX_GRID: usize = 1024;

const KERNELS: &[&str] = &[
    "fill",
    "lincomb",
    "multiply",
    "abs",
    "sign",
    "add_scalar",
    "max_scalar",
    "max_vector",
    "sum",
];

/// Serialises module compilation so two threads don't compile the same module.
static COMPILE: Mutex<()> = Mutex::new(());

static BLAS: OnceLock<Mutex<HashMap<usize, Arc<CudaBlas>>>> = OnceLock::new();

fn module_name(dtype: DType) -> String {
    format!("fnspace_{}", dtype.name())
}

/// Type integer arithmetic is carried out in, so that overflow wraps.
fn wrapping_type(dtype: DType) -> &'static str {
    match dtype {
        DType::Float32 | DType::Float64 => dtype.c_type(),
        DType::Int64 | DType::UInt64 => "unsigned long long",
        _ => "unsigned int",
    }
}

fn abs_expr(dtype: DType) -> &'static str {
    match dtype {
        DType::Float32 => "fabsf(v)",
        DType::Float64 => "fabs(v)",
        _ if dtype.is_signed() => "(T)(v < 0 ? (W)0 - (W)v : (W)v)",
        _ => "v",
    }
}

fn kernel_source(dtype: DType) -> String {
    format!(
        r#"
typedef {t} T;
typedef {w} W;

#define BLOCK {block}
#define FOR_EACH(n) \
    for (unsigned long long i = blockIdx.x * (unsigned long long)blockDim.x + threadIdx.x; \
         i < n; i += (unsigned long long)blockDim.x * gridDim.x)

extern "C" __global__ void fill(unsigned long long n, T value, T* z) {{
    FOR_EACH(n) z[i] = value;
}}

extern "C" __global__ void lincomb(unsigned long long n, T a, const T* x, T b, const T* y, T* z) {{
    FOR_EACH(n) z[i] = (T)((W)a * (W)x[i] + (W)b * (W)y[i]);
}}

extern "C" __global__ void multiply(unsigned long long n, const T* x, const T* y, T* z) {{
    FOR_EACH(n) z[i] = (T)((W)x[i] * (W)y[i]);
}}

extern "C" __global__ void abs(unsigned long long n, const T* x, T* z) {{
    FOR_EACH(n) {{
        T v = x[i];
        z[i] = {abs};
    }}
}}

extern "C" __global__ void sign(unsigned long long n, const T* x, T* z) {{
    FOR_EACH(n) {{
        T v = x[i];
        z[i] = (T)((v > 0) - (v < 0));
    }}
}}

extern "C" __global__ void add_scalar(unsigned long long n, const T* x, T s, T* z) {{
    FOR_EACH(n) z[i] = (T)((W)x[i] + (W)s);
}}

extern "C" __global__ void max_scalar(unsigned long long n, const T* x, T s, T* z) {{
    FOR_EACH(n) {{
        T v = x[i];
        z[i] = v > s ? v : s;
    }}
}}

extern "C" __global__ void max_vector(unsigned long long n, const T* x, const T* y, T* z) {{
    FOR_EACH(n) {{
        T v = x[i];
        T w = y[i];
        z[i] = v > w ? v : w;
    }}
}}

extern "C" __global__ void sum(unsigned long long n, const T* x, T* partial) {{
    __shared__ W cache[BLOCK];
    W acc = 0;
    FOR_EACH(n) acc += (W)x[i];
    cache[threadIdx.x] = acc;
    __syncthreads();
    for (unsigned int s = blockDim.x / 2; s > 0; s >>= 1) {{
        if (threadIdx.x < s) cache[threadIdx.x] += cache[threadIdx.x + s];
        __syncthreads();
    }}
    if (threadIdx.x == 0) partial[blockIdx.x] = (T)cache[0];
}}
"#,
        t = dtype.c_type(),
        w = wrapping_type(dtype),
        block = BLOCK,
        abs = abs_expr(dtype),
    )
}

fn launch_config(n: usize) -> LaunchConfig {
    let grid = ((n + BLOCK as usize - 1) / BLOCK as usize).clamp(1, MAX_GRID);
    LaunchConfig {
        grid_dim: (grid as u32, 1, 1),
        block_dim: (BLOCK, 1, 1),
        shared_mem_bytes: 0,
    }
}

/// Fetches a kernel for element type `T`, compiling and loading the module on first use.
fn kernel<T: Element>(cuda: &Cuda, name: &str) -> Result<CudaFunction, CudaError> {
    let dev = cuda.cuda_device();
    let module = module_name(T::DTYPE);

    if !dev.has_func(&module, name) {
        let _guard = COMPILE.lock();
        if !dev.has_func(&module, name) {
            tracing::debug!(module = %module, ordinal = cuda.ordinal(), "compiling kernel module");
            let ptx = compile_ptx(kernel_source(T::DTYPE)).map_err(|e| CudaError::Compile {
                module: module.clone(),
                msg: e.to_string(),
            })?;
            dev.load_ptx(ptx, &module, KERNELS)?;
        }
    }

    dev.get_func(&module, name)
        .ok_or_else(|| CudaError::FuncNotFound(format!("{module}::{name}")))
}

unsafe fn launch<T: Element, P>(
    cuda: &Cuda,
    name: &str,
    n: usize,
    params: P,
) -> Result<(), CudaError>
where
    CudaFunction: LaunchAsync<P>,
{
    if n == 0 {
        return Ok(());
    }
    let func = kernel::<T>(cuda, name)?;
    func.launch(launch_config(n), params)?;
    cuda.synchronize()
}

impl<T: Element + DeviceRepr> VectorKernels<Cuda> for T {
    unsafe fn fill(cuda: &Cuda, n: usize, value: T, z: CudaPtr<T>) -> Result<(), CudaError> {
        launch::<T, _>(cuda, "fill", n, (n as u64, value, z.addr()))
    }

    unsafe fn lincomb(
        cuda: &Cuda,
        n: usize,
        a: T,
        x: CudaPtr<T>,
        b: T,
        y: CudaPtr<T>,
        z: CudaPtr<T>,
    ) -> Result<(), CudaError> {
        let params = (n as u64, a, x.addr(), b, y.addr(), z.addr());
        launch::<T, _>(cuda, "lincomb", n, params)
    }

    unsafe fn multiply(
        cuda: &Cuda,
        n: usize,
        x: CudaPtr<T>,
        y: CudaPtr<T>,
        z: CudaPtr<T>,
    ) -> Result<(), CudaError> {
        launch::<T, _>(cuda, "multiply", n, (n as u64, x.addr(), y.addr(), z.addr()))
    }

    unsafe fn abs(cuda: &Cuda, n: usize, x: CudaPtr<T>, z: CudaPtr<T>) -> Result<(), CudaError> {
        launch::<T, _>(cuda, "abs", n, (n as u64, x.addr(), z.addr()))
    }

    unsafe fn sign(cuda: &Cuda, n: usize, x: CudaPtr<T>, z: CudaPtr<T>) -> Result<(), CudaError> {
        launch::<T, _>(cuda, "sign", n, (n as u64, x.addr(), z.addr()))
    }

    unsafe fn add_scalar(
        cuda: &Cuda,
        n: usize,
        x: CudaPtr<T>,
        scalar: T,
        z: CudaPtr<T>,
    ) -> Result<(), CudaError> {
        launch::<T, _>(cuda, "add_scalar", n, (n as u64, x.addr(), scalar, z.addr()))
    }

    unsafe fn max_scalar(
        cuda: &Cuda,
        n: usize,
        x: CudaPtr<T>,
        scalar: T,
        z: CudaPtr<T>,
    ) -> Result<(), CudaError> {
        launch::<T, _>(cuda, "max_scalar", n, (n as u64, x.addr(), scalar, z.addr()))
    }

    unsafe fn max_vector(
        cuda: &Cuda,
        n: usize,
        x: CudaPtr<T>,
        y: CudaPtr<T>,
        z: CudaPtr<T>,
    ) -> Result<(), CudaError> {
        launch::<T, _>(cuda, "max_vector", n, (n as u64, x.addr(), y.addr(), z.addr()))
    }

    unsafe fn sum(cuda: &Cuda, n: usize, x: CudaPtr<T>) -> Result<T, CudaError> {
        if n == 0 {
            return Ok(T::zero());
        }
        let blocks = launch_config(n).grid_dim.0 as usize;
        let partial = Buffer::<T, Cuda>::zeroed_in(blocks, cuda.clone())?;
        let params = (n as u64, x.addr(), partial.as_ptr().addr());
        launch::<T, _>(cuda, "sum", n, params)?;
        let partial = partial.to_host_vec()?;
        Ok(partial.into_iter().fold(T::zero(), T::elem_add))
    }
}

fn blas_err(err: impl Debug) -> CudaError {
    CudaError::Blas(format!("{err:?}"))
}

fn cublas(cuda: &Cuda) -> Result<Arc<CudaBlas>, CudaError> {
    let mut handles = BLAS.get_or_init(Default::default).lock();
    if let Some(blas) = handles.get(&cuda.ordinal()) {
        return Ok(Arc::clone(blas));
    }
    let blas = Arc::new(CudaBlas::new(Arc::clone(cuda.cuda_device())).map_err(blas_err)?);
    handles.insert(cuda.ordinal(), Arc::clone(&blas));
    Ok(blas)
}

fn blas_len(n: usize) -> Result<i32, CudaError> {
    i32::try_from(n)
        .map_err(|_| CudaError::Blas(format!("{n} elements exceed the cublas index range")))
}

macro_rules! impl_inner_product {
    ($float:ident => dot: $dot:path, nrm2: $nrm2:path) => {
        impl InnerProduct<Cuda> for $float {
            unsafe fn dot(
                cuda: &Cuda,
                n: usize,
                x: CudaPtr<$float>,
                y: CudaPtr<$float>,
            ) -> Result<$float, CudaError> {
                let n = blas_len(n)?;
                let blas = cublas(cuda)?;
                cuda.synchronize()?;
                let mut out: $float = 0.0;
                $dot(*blas.handle(), n, x.as_raw(), 1, y.as_raw(), 1, &mut out)
                    .result()
                    .map_err(blas_err)?;
                Ok(out)
            }

            unsafe fn nrm2(cuda: &Cuda, n: usize, x: CudaPtr<$float>) -> Result<$float, CudaError> {
                let n = blas_len(n)?;
                let blas = cublas(cuda)?;
                cuda.synchronize()?;
                let mut out: $float = 0.0;
                $nrm2(*blas.handle(), n, x.as_raw(), 1, &mut out)
                    .result()
                    .map_err(blas_err)?;
                Ok(out)
            }
        }
    };
}

impl_inner_product!(f32 => dot: cublas_sys::cublasSdot_v2, nrm2: cublas_sys::cublasSnrm2_v2);
impl_inner_product!(f64 => dot: cublas_sys::cublasDdot_v2, nrm2: cublas_sys::cublasDnrm2_v2);

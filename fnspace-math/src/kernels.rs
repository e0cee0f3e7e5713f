use fnspace_sys::{device::Device, ptr::DPtr, Element};
use num_traits::Float;

mod cpu;
#[cfg(feature = "cuda")]
pub mod cuda;

/// Elementwise kernels over device memory.
///
/// Every output pointer may alias any of the inputs. `n` is the number of
/// elements and all pointers must be valid for `n` elements on `device`.
/// Integer arithmetic wraps on overflow.
#[allow(clippy::missing_safety_doc, clippy::too_many_arguments)]
pub trait VectorKernels<D: Device>: Element {
    /// `z[i] = value`
    unsafe fn fill(device: &D, n: usize, value: Self, z: DPtr<Self, D>) -> Result<(), D::Error>;

    /// `z[i] = a * x[i] + b * y[i]`
    unsafe fn lincomb(
        device: &D,
        n: usize,
        a: Self,
        x: DPtr<Self, D>,
        b: Self,
        y: DPtr<Self, D>,
        z: DPtr<Self, D>,
    ) -> Result<(), D::Error>;

    /// `z[i] = x[i] * y[i]`
    unsafe fn multiply(
        device: &D,
        n: usize,
        x: DPtr<Self, D>,
        y: DPtr<Self, D>,
        z: DPtr<Self, D>,
    ) -> Result<(), D::Error>;

    /// `z[i] = |x[i]|`
    unsafe fn abs(device: &D, n: usize, x: DPtr<Self, D>, z: DPtr<Self, D>)
        -> Result<(), D::Error>;

    /// `z[i] = sign(x[i])`, one of `-1`, `0`, `1`
    unsafe fn sign(
        device: &D,
        n: usize,
        x: DPtr<Self, D>,
        z: DPtr<Self, D>,
    ) -> Result<(), D::Error>;

    /// `z[i] = x[i] + scalar`
    unsafe fn add_scalar(
        device: &D,
        n: usize,
        x: DPtr<Self, D>,
        scalar: Self,
        z: DPtr<Self, D>,
    ) -> Result<(), D::Error>;

    /// `z[i] = max(x[i], scalar)`
    unsafe fn max_scalar(
        device: &D,
        n: usize,
        x: DPtr<Self, D>,
        scalar: Self,
        z: DPtr<Self, D>,
    ) -> Result<(), D::Error>;

    /// `z[i] = max(x[i], y[i])`
    unsafe fn max_vector(
        device: &D,
        n: usize,
        x: DPtr<Self, D>,
        y: DPtr<Self, D>,
        z: DPtr<Self, D>,
    ) -> Result<(), D::Error>;

    /// Sum of all `n` elements of `x`.
    unsafe fn sum(device: &D, n: usize, x: DPtr<Self, D>) -> Result<Self, D::Error>;
}

/// The euclidean inner product and norm, for floating point element types.
#[allow(clippy::missing_safety_doc)]
pub trait InnerProduct<D: Device>: VectorKernels<D> + Float {
    unsafe fn dot(
        device: &D,
        n: usize,
        x: DPtr<Self, D>,
        y: DPtr<Self, D>,
    ) -> Result<Self, D::Error>;

    unsafe fn nrm2(device: &D, n: usize, x: DPtr<Self, D>) -> Result<Self, D::Error>;
}

use fnspace_sys::{
    device::cpu::{Cpu, CpuError},
    Element,
};

use super::{InnerProduct, VectorKernels};

#[cfg(feature = "blas-sys")]
mod blas;

/// Applies `f` to every index, writing the result to `z`.
///
/// Reads for index `i` happen before the write to `z[i]`, so aliasing
/// inputs and outputs is fine.
#[inline]
unsafe fn map_into<T: Element>(n: usize, z: *mut T, f: impl Fn(usize) -> T) {
    for i in 0..n {
        let v = f(i);
        z.add(i).write(v);
    }
}

impl<T: Element> VectorKernels<Cpu> for T {
    unsafe fn fill(_: &Cpu, n: usize, value: T, z: *mut T) -> Result<(), CpuError> {
        map_into(n, z, |_| value);
        Ok(())
    }

    unsafe fn lincomb(
        _: &Cpu,
        n: usize,
        a: T,
        x: *mut T,
        b: T,
        y: *mut T,
        z: *mut T,
    ) -> Result<(), CpuError> {
        map_into(n, z, |i| a.elem_mul(*x.add(i)).elem_add(b.elem_mul(*y.add(i))));
        Ok(())
    }

    unsafe fn multiply(
        _: &Cpu,
        n: usize,
        x: *mut T,
        y: *mut T,
        z: *mut T,
    ) -> Result<(), CpuError> {
        map_into(n, z, |i| (*x.add(i)).elem_mul(*y.add(i)));
        Ok(())
    }

    unsafe fn abs(_: &Cpu, n: usize, x: *mut T, z: *mut T) -> Result<(), CpuError> {
        map_into(n, z, |i| (*x.add(i)).elem_abs());
        Ok(())
    }

    unsafe fn sign(_: &Cpu, n: usize, x: *mut T, z: *mut T) -> Result<(), CpuError> {
        map_into(n, z, |i| (*x.add(i)).elem_sign());
        Ok(())
    }

    unsafe fn add_scalar(
        _: &Cpu,
        n: usize,
        x: *mut T,
        scalar: T,
        z: *mut T,
    ) -> Result<(), CpuError> {
        map_into(n, z, |i| (*x.add(i)).elem_add(scalar));
        Ok(())
    }

    unsafe fn max_scalar(
        _: &Cpu,
        n: usize,
        x: *mut T,
        scalar: T,
        z: *mut T,
    ) -> Result<(), CpuError> {
        map_into(n, z, |i| (*x.add(i)).elem_max(scalar));
        Ok(())
    }

    unsafe fn max_vector(
        _: &Cpu,
        n: usize,
        x: *mut T,
        y: *mut T,
        z: *mut T,
    ) -> Result<(), CpuError> {
        map_into(n, z, |i| (*x.add(i)).elem_max(*y.add(i)));
        Ok(())
    }

    unsafe fn sum(_: &Cpu, n: usize, x: *mut T) -> Result<T, CpuError> {
        Ok((0..n).fold(T::zero(), |acc, i| acc.elem_add(*x.add(i))))
    }
}

macro_rules! impl_inner_product {
    ($float:ident => dot: $dot:ident, nrm2: $nrm2:ident) => {
        impl InnerProduct<Cpu> for $float {
            unsafe fn dot(
                _: &Cpu,
                n: usize,
                x: *mut $float,
                y: *mut $float,
            ) -> Result<$float, CpuError> {
                #[cfg(feature = "blas-sys")]
                if let Ok(n) = i32::try_from(n) {
                    return Ok(blas::$dot(n, x, y));
                }
                Ok((0..n).map(|i| *x.add(i) * *y.add(i)).sum())
            }

            unsafe fn nrm2(_: &Cpu, n: usize, x: *mut $float) -> Result<$float, CpuError> {
                #[cfg(feature = "blas-sys")]
                if let Ok(n) = i32::try_from(n) {
                    return Ok(blas::$nrm2(n, x));
                }
                // scaled sum of squares, like the reference nrm2
                let scale = (0..n).fold(0.0 as $float, |m, i| m.max((*x.add(i)).abs()));
                if scale == 0.0 || !scale.is_finite() {
                    return Ok(scale);
                }
                let ssq: $float = (0..n)
                    .map(|i| {
                        let v = *x.add(i) / scale;
                        v * v
                    })
                    .sum();
                Ok(scale * ssq.sqrt())
            }
        }
    };
}

impl_inner_product!(f32 => dot: sdot, nrm2: snrm2);
impl_inner_product!(f64 => dot: ddot, nrm2: dnrm2);

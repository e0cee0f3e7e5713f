//! Spaces whose element type is chosen at runtime.
//!
//! [`DynSpace`] carries a [`DType`] tag instead of a type parameter and
//! forwards every operation to the matching [`FnSpace`].
use std::{ffi::c_void, fmt};

use fnspace_sys::{
    device::{cpu::Cpu, DefaultDevice, Device},
    ptr::{DPtr, DevicePtr},
    Buffer, DType, Element,
};
use num_traits::{NumCast, ToPrimitive};

use crate::{
    error::{Error, Result},
    kernels::VectorKernels,
    slice::Slice,
    space::FnSpace,
    vector::Vector,
};

/// Runs `$body` with `$t` bound to the element type named by `$dtype`.
macro_rules! dispatch {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            DType::Float32 => {
                type $t = f32;
                $body
            }
            DType::Float64 => {
                type $t = f64;
                $body
            }
            DType::Int8 => {
                type $t = i8;
                $body
            }
            DType::Int16 => {
                type $t = i16;
                $body
            }
            DType::Int32 => {
                type $t = i32;
                $body
            }
            DType::Int64 => {
                type $t = i64;
                $body
            }
            DType::UInt8 => {
                type $t = u8;
                $body
            }
            DType::UInt16 => {
                type $t = u16;
                $body
            }
            DType::UInt32 => {
                type $t = u32;
                $body
            }
            DType::UInt64 => {
                type $t = u64;
                $body
            }
        }
    };
}

/// Declares an enum with one variant per dtype, each wrapping `$inner<T, D>`.
macro_rules! dtype_enum {
    ($(#[$meta:meta])* $name:ident wraps $inner:ident) => {
        $(#[$meta])*
        pub enum $name<D: Device = Cpu> {
            Float32($inner<f32, D>),
            Float64($inner<f64, D>),
            Int8($inner<i8, D>),
            Int16($inner<i16, D>),
            Int32($inner<i32, D>),
            Int64($inner<i64, D>),
            UInt8($inner<u8, D>),
            UInt16($inner<u16, D>),
            UInt32($inner<u32, D>),
            UInt64($inner<u64, D>),
        }

        dtype_enum!(@from $name $inner; Float32 f32, Float64 f64, Int8 i8, Int16 i16, Int32 i32,
            Int64 i64, UInt8 u8, UInt16 u16, UInt32 u32, UInt64 u64);
    };
    (@from $name:ident $inner:ident; $($variant:ident $t:ty),*) => {
        $(
            impl<D: Device> From<$inner<$t, D>> for $name<D> {
                fn from(inner: $inner<$t, D>) -> Self {
                    $name::$variant(inner)
                }
            }
        )*
    };
}

/// Runs `$body` with `$x` bound to the payload of any variant of `$value`.
macro_rules! each_variant {
    ($enum:ident, $value:expr, $x:ident => $body:expr) => {
        match $value {
            $enum::Float32($x) => $body,
            $enum::Float64($x) => $body,
            $enum::Int8($x) => $body,
            $enum::Int16($x) => $body,
            $enum::Int32($x) => $body,
            $enum::Int64($x) => $body,
            $enum::UInt8($x) => $body,
            $enum::UInt16($x) => $body,
            $enum::UInt32($x) => $body,
            $enum::UInt64($x) => $body,
        }
    };
}

dtype_enum! {
    /// A device buffer of any supported element type.
    DynBuffer wraps Buffer
}

dtype_enum! {
    /// An element of a [`DynSpace`].
    DynVector wraps Vector
}

impl<D: Device> DynBuffer<D> {
    pub fn dtype(&self) -> DType {
        each_variant!(DynBuffer, self, b => b.dtype())
    }

    pub fn len(&self) -> usize {
        each_variant!(DynBuffer, self, b => b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: Device> fmt::Debug for DynBuffer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        each_variant!(DynBuffer, self, b => fmt::Debug::fmt(b, f))
    }
}

impl<D: Device> DynVector<D> {
    pub fn dtype(&self) -> DType {
        each_variant!(DynVector, self, x => x.dtype())
    }

    pub fn len(&self) -> usize {
        each_variant!(DynVector, self, x => x.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn space(&self) -> DynSpace<D> {
        each_variant!(DynVector, self, x => DynSpace::from(x.space()))
    }

    /// Copies the entries to the host, widened to `f64`.
    ///
    /// 64 bit integers beyond 2^53 lose precision.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        each_variant!(DynVector, self, x => widen(x))
    }

    pub fn try_clone(&self) -> Result<Self> {
        each_variant!(DynVector, self, x => Ok(x.try_clone()?.into()))
    }

    pub fn into_buffer(self) -> DynBuffer<D> {
        each_variant!(DynVector, self, x => x.into_buffer().into())
    }

    /// Untyped device address of the first element.
    pub fn data_ptr(&self) -> *mut c_void {
        each_variant!(DynVector, self, x => x.data_ptr().as_raw().cast())
    }

    /// Reads a single element widened to `f64`, see [`Vector::get`].
    pub fn get(&self, index: isize) -> Result<f64> {
        each_variant!(DynVector, self, x => widen_one(x.get(index)?))
    }

    /// Writes a single element. `value` must be representable in the dtype.
    pub fn set(&mut self, index: isize, value: f64) -> Result<()> {
        each_variant!(DynVector, self, x => x.set(index, scalar(value)?))
    }

    pub fn get_slice(&self, slice: impl Into<Slice>) -> Result<Vec<f64>> {
        each_variant!(DynVector, self, x => x.get_slice(slice)?.into_iter().map(widen_one).collect())
    }

    /// Writes `values` to the elements selected by `slice`, converting each
    /// one to the dtype first. Nothing is written if any value doesn't fit.
    pub fn set_slice(&mut self, slice: impl Into<Slice>, values: &[f64]) -> Result<()> {
        each_variant!(DynVector, self, x => {
            let values = values.iter().map(|&v| scalar(v)).collect::<Result<Vec<_>>>()?;
            x.set_slice(slice, &values)
        })
    }
}

fn widen<T: Element, D: Device>(x: &Vector<T, D>) -> Result<Vec<f64>> {
    x.to_vec()?.into_iter().map(widen_one).collect()
}

fn widen_one<T: Element>(v: T) -> Result<f64> {
    v.to_f64().ok_or_else(|| Error::Conversion {
        value: v.to_string(),
        dtype: DType::Float64,
    })
}

impl<D: Device> fmt::Display for DynVector<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        each_variant!(DynVector, self, x => fmt::Display::fmt(x, f))
    }
}

impl<D: Device> fmt::Debug for DynVector<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        each_variant!(DynVector, self, x => fmt::Debug::fmt(x, f))
    }
}

/// `F^n` over an element type picked at runtime.
///
/// ```
/// # use fnspace_math::{sys::DType, DynSpace};
/// let space = DynSpace::new(3, DType::Int32)?;
/// let x = space.element_from_cast(&[1.0, 2.0, 3.0])?;
/// let mut z = space.element()?;
/// space.lincomb(&mut z, 2.0, &x, -1.0, &x)?;
/// assert_eq!(z.to_f64_vec()?, [1.0, 2.0, 3.0]);
/// assert_eq!(format!("{space:?}"), "CpuFn(3, 'int32')");
/// # Ok::<(), fnspace_math::Error>(())
/// ```
#[derive(Clone, PartialEq)]
pub struct DynSpace<D: Device = Cpu> {
    dim: usize,
    dtype: DType,
    device: D,
}

impl DynSpace<Cpu> {
    pub fn new(dim: usize, dtype: DType) -> Result<Self> {
        Self::with_device(dim, dtype, Cpu)
    }

    /// Like [`DynSpace::new`], with the element type given by name, eg `"uint8"`.
    pub fn from_name(dim: usize, dtype: &str) -> Result<Self> {
        Self::new(dim, dtype.parse()?)
    }
}

impl<D: Device> DynSpace<D> {
    pub fn on_default_device(dim: usize, dtype: DType) -> Result<Self>
    where
        D: DefaultDevice,
    {
        Error::check_enabled::<D>()?;
        let device = D::default_device().map_err(Error::unavailable::<D>)?;
        Self::with_device(dim, dtype, device)
    }

    pub fn with_device(dim: usize, dtype: DType, device: D) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidDimension(dim));
        }
        Ok(Self { dim, dtype, device })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// The statically typed space this one stands for.
    pub fn typed<T: Element>(&self) -> Result<FnSpace<T, D>> {
        if T::DTYPE != self.dtype {
            return Err(Error::DTypeMismatch {
                expected: self.dtype,
                found: T::DTYPE,
            });
        }
        FnSpace::with_device(self.dim, self.device.clone())
    }

    pub fn contains(&self, x: &DynVector<D>) -> bool {
        x.space() == *self
    }

    /// A new element with zero-initialised storage.
    pub fn element(&self) -> Result<DynVector<D>> {
        dispatch!(self.dtype, T => Ok(self.typed::<T>()?.element()?.into()))
    }

    /// A new element holding a copy of `values`, whose type must match the dtype.
    pub fn element_from<T: Element>(&self, values: &[T]) -> Result<DynVector<D>>
    where
        DynVector<D>: From<Vector<T, D>>,
    {
        Ok(self.typed::<T>()?.element_from(values)?.into())
    }

    /// An element viewing foreign device memory holding `dim` elements of
    /// this space's dtype. The memory is never freed by the returned vector.
    ///
    /// # Safety
    /// See [`FnSpace::element_from_raw`]. `ptr` must point at elements of
    /// [`DynSpace::dtype`].
    pub unsafe fn element_from_raw(&self, ptr: *mut c_void) -> Result<DynVector<D>> {
        dispatch!(self.dtype, T => {
            let ptr = <DPtr<T, D> as DevicePtr<T>>::from_raw(ptr.cast::<T>());
            Ok(self.typed::<T>()?.element_from_raw(ptr)?.into())
        })
    }

    /// A new element holding `values` converted to this space's dtype.
    pub fn element_from_cast<U: ToPrimitive + Copy + fmt::Debug>(
        &self,
        values: &[U],
    ) -> Result<DynVector<D>> {
        dispatch!(self.dtype, T => Ok(self.typed::<T>()?.element_from_cast(values)?.into()))
    }

    /// Wraps an existing buffer, which must hold this space's dtype.
    pub fn element_from_buffer(&self, data: DynBuffer<D>) -> Result<DynVector<D>> {
        if data.dtype() != self.dtype {
            return Err(Error::DTypeMismatch {
                expected: self.dtype,
                found: data.dtype(),
            });
        }
        each_variant!(DynBuffer, data, b => Ok(self.typed()?.element_from_buffer(b)?.into()))
    }
}

impl<D: Device> DynSpace<D>
where
    f32: VectorKernels<D>,
    f64: VectorKernels<D>,
    i8: VectorKernels<D>,
    i16: VectorKernels<D>,
    i32: VectorKernels<D>,
    i64: VectorKernels<D>,
    u8: VectorKernels<D>,
    u16: VectorKernels<D>,
    u32: VectorKernels<D>,
    u64: VectorKernels<D>,
{
    pub fn zero(&self) -> Result<DynVector<D>> {
        dispatch!(self.dtype, T => Ok(self.typed::<T>()?.zero()?.into()))
    }

    /// `z := a*x + b*y`. The scalars are converted to the space's dtype first.
    pub fn lincomb(
        &self,
        z: &mut DynVector<D>,
        a: f64,
        x: &DynVector<D>,
        b: f64,
        y: &DynVector<D>,
    ) -> Result<()> {
        for v in [&*z, x, y] {
            if v.dtype() != self.dtype {
                return Err(Error::DTypeMismatch {
                    expected: self.dtype,
                    found: v.dtype(),
                });
            }
        }
        macro_rules! typed_lincomb {
            ($($variant:ident),*) => {
                match (z, x, y) {
                    $(
                        (DynVector::$variant(z), DynVector::$variant(x), DynVector::$variant(y)) => {
                            let space = self.typed()?;
                            space.lincomb(z, scalar(a)?, x, scalar(b)?, y)
                        }
                    )*
                    _ => unreachable!("operand dtypes were checked above"),
                }
            };
        }
        typed_lincomb!(Float32, Float64, Int8, Int16, Int32, Int64, UInt8, UInt16, UInt32, UInt64)
    }
}

/// Converts a runtime scalar to `T`. Integer dtypes reject fractional values
/// rather than truncating them.
fn scalar<T: Element>(value: f64) -> Result<T> {
    let exact = T::DTYPE.is_float() || value.fract() == 0.0;
    exact
        .then(|| <T as NumCast>::from(value))
        .flatten()
        .ok_or_else(|| Error::Conversion {
            value: value.to_string(),
            dtype: T::DTYPE,
        })
}

impl<T: Element, D: Device> From<&FnSpace<T, D>> for DynSpace<D> {
    fn from(space: &FnSpace<T, D>) -> Self {
        Self {
            dim: space.dim(),
            dtype: T::DTYPE,
            device: space.device().clone(),
        }
    }
}

impl<T: Element, D: Device> PartialEq<FnSpace<T, D>> for DynSpace<D> {
    fn eq(&self, other: &FnSpace<T, D>) -> bool {
        self.dim == other.dim() && self.dtype == T::DTYPE && &self.device == other.device()
    }
}

impl<D: Device> fmt::Display for DynSpace<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Fn({})", D::NAME, self.dim)
    }
}

impl<D: Device> fmt::Debug for DynSpace<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dtype == DType::Float32 {
            write!(f, "{}Fn({})", D::NAME, self.dim)
        } else {
            write!(f, "{}Fn({}, '{}')", D::NAME, self.dim, self.dtype)
        }
    }
}

#[cfg(test)]
mod tests {
    use fnspace_sys::{Buffer, DType};

    use super::{DynBuffer, DynSpace, DynVector};
    use crate::{error::Error, slice::Slice, space::FnSpace};

    #[test]
    fn construction() {
        let space = DynSpace::new(3, DType::UInt8).unwrap();
        assert_eq!(space.dim(), 3);
        assert_eq!(space, FnSpace::<u8>::new(3).unwrap());
        assert_eq!(space, DynSpace::from_name(3, "u8").unwrap());
        assert_ne!(space, DynSpace::new(3, DType::Int8).unwrap());

        assert!(matches!(
            DynSpace::new(0, DType::Float64),
            Err(Error::InvalidDimension(0))
        ));
        assert!(matches!(
            DynSpace::from_name(3, "complex128"),
            Err(Error::UnknownDType(_))
        ));
    }

    #[test]
    fn element_per_dtype() {
        for dtype in DType::ALL {
            let space = DynSpace::new(4, dtype).unwrap();
            let x = space.element().unwrap();
            assert_eq!(x.dtype(), dtype);
            assert_eq!(x.len(), 4);
            assert!(space.contains(&x));
            assert_eq!(space.zero().unwrap().to_f64_vec().unwrap(), [0.0; 4]);
        }
    }

    #[test]
    fn element_from_buffer_checks_dtype() {
        let space = DynSpace::new(3, DType::Float32).unwrap();
        let good = DynBuffer::from(Buffer::<f32>::copy_from_host(&[1.0, 2.0, 3.0]).unwrap());
        let x = space.element_from_buffer(good).unwrap();
        assert_eq!(x.to_f64_vec().unwrap(), [1.0, 2.0, 3.0]);

        let bad = DynBuffer::from(Buffer::<f64>::copy_from_host(&[1.0, 2.0, 3.0]).unwrap());
        assert!(matches!(
            space.element_from_buffer(bad),
            Err(Error::DTypeMismatch {
                expected: DType::Float32,
                found: DType::Float64,
            })
        ));

        let short = DynBuffer::from(Buffer::<f32>::copy_from_host(&[1.0, 2.0]).unwrap());
        assert!(matches!(
            space.element_from_buffer(short),
            Err(Error::LengthMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn lincomb() {
        let space = DynSpace::new(3, DType::Int16).unwrap();
        let x = space.element_from_cast(&[1, 2, 3]).unwrap();
        let y = space.element_from_cast(&[10, 20, 30]).unwrap();
        let mut z = space.element().unwrap();
        space.lincomb(&mut z, 2.0, &x, -1.0, &y).unwrap();
        assert_eq!(z.to_f64_vec().unwrap(), [-8.0, -16.0, -24.0]);

        let err = space.lincomb(&mut z, 1e6, &x, 1.0, &y).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));

        let other = DynSpace::new(3, DType::Int32).unwrap().element().unwrap();
        assert!(matches!(
            space.lincomb(&mut z, 1.0, &other, 1.0, &y),
            Err(Error::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn fractional_scalars_rejected_for_integers() {
        let space = DynSpace::new(2, DType::Int32).unwrap();
        let x = space.element_from_cast(&[1, 2]).unwrap();
        let mut z = space.element().unwrap();
        assert!(matches!(
            space.lincomb(&mut z, 0.5, &x, 0.0, &x),
            Err(Error::Conversion { dtype: DType::Int32, .. })
        ));
        assert_eq!(z.to_f64_vec().unwrap(), [0.0, 0.0]);

        let space = DynSpace::new(2, DType::Float32).unwrap();
        let x = space.element_from_cast(&[1, 2]).unwrap();
        let mut z = space.element().unwrap();
        space.lincomb(&mut z, 0.5, &x, 0.0, &x).unwrap();
        assert_eq!(z.to_f64_vec().unwrap(), [0.5, 1.0]);
    }

    #[test]
    fn element_access_per_dtype() {
        for dtype in DType::ALL {
            let space = DynSpace::new(4, dtype).unwrap();
            let mut x = space.element_from_cast(&[1, 2, 3, 4]).unwrap();

            assert_eq!(x.get(0).unwrap(), 1.0);
            assert_eq!(x.get(-1).unwrap(), 4.0);
            x.set(1, 7.0).unwrap();
            assert_eq!(x.get(1).unwrap(), 7.0);

            assert_eq!(x.get_slice(Slice::FULL.with_step(2)).unwrap(), [1.0, 3.0]);
            x.set_slice(Slice::range(2, 4), &[5.0, 6.0]).unwrap();
            assert_eq!(x.to_f64_vec().unwrap(), [1.0, 7.0, 5.0, 6.0]);

            assert!(matches!(x.get(4), Err(Error::IndexOutOfBounds { .. })));
            if dtype.is_float() {
                x.set(0, 0.25).unwrap();
                assert_eq!(x.get(0).unwrap(), 0.25);
            } else {
                assert!(matches!(x.set(0, 0.25), Err(Error::Conversion { .. })));
                assert!(x.set_slice(.., &[1.0, 2.0, 3.5, 4.0]).is_err());
                assert_eq!(x.to_f64_vec().unwrap(), [1.0, 7.0, 5.0, 6.0]);
            }
            if !dtype.is_signed() {
                assert!(matches!(x.set(0, -1.0), Err(Error::Conversion { .. })));
            }
        }
    }

    #[test]
    fn typed_element_from() {
        let space = DynSpace::new(3, DType::UInt16).unwrap();
        let x = space.element_from(&[1u16, 2, 3]).unwrap();
        assert!(matches!(x, DynVector::UInt16(_)));
        assert_eq!(x.to_f64_vec().unwrap(), [1.0, 2.0, 3.0]);

        assert!(matches!(
            space.element_from(&[1i32, 2, 3]),
            Err(Error::DTypeMismatch {
                expected: DType::UInt16,
                found: DType::Int32,
            })
        ));
        assert!(matches!(
            space.element_from(&[1u16, 2]),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn raw_views_per_dtype() {
        for dtype in DType::ALL {
            let space = DynSpace::new(3, dtype).unwrap();
            let mut owner = space.element_from_cast(&[1, 2, 3]).unwrap();
            let ptr = owner.data_ptr();
            assert!(!ptr.is_null());

            let view = unsafe { space.element_from_raw(ptr) }.unwrap();
            assert_eq!(view.dtype(), dtype);
            assert_eq!(view.data_ptr(), ptr);
            assert_eq!(view.to_f64_vec().unwrap(), [1.0, 2.0, 3.0]);

            owner.set(0, 9.0).unwrap();
            assert_eq!(view.get(0).unwrap(), 9.0);
            drop(view);
            assert_eq!(owner.get(0).unwrap(), 9.0);
        }

        let space = DynSpace::new(3, DType::Float64).unwrap();
        assert!(matches!(
            unsafe { space.element_from_raw(std::ptr::null_mut()) },
            Err(Error::NullPointer)
        ));
    }

    #[test]
    fn formatting() {
        let space = DynSpace::new(2, DType::Float64).unwrap();
        let x = space.element_from_cast(&[1.5, 2.5]).unwrap();
        assert_eq!(x.to_string(), "[1.5, 2.5]");
        assert_eq!(format!("{x:?}"), "CpuFn(2, 'float64').element([1.5, 2.5])");
        assert_eq!(DynSpace::new(2, DType::Float32).unwrap().to_string(), "CpuFn(2)");
        assert!(matches!(x, DynVector::Float64(_)));
    }
}

use std::{fmt, marker::PhantomData};

use fnspace_sys::{
    device::{cpu::Cpu, DefaultDevice, Device},
    ptr::{DPtr, NonNull},
    Buffer, DType, Element,
};
use num_traits::{NumCast, ToPrimitive};

use crate::{
    error::{Error, Result},
    kernels::{InnerProduct, VectorKernels},
    vector::Vector,
};

/// The space `F^n` of `dim`-tuples of `T`, stored on device `D`.
///
/// ```
/// # use fnspace_math::space::FnSpace;
/// let space = FnSpace::<f64>::new(3)?;
/// let x = space.element_from(&[1.0, 2.0, 3.0])?;
/// let y = space.element_from(&[4.0, 5.0, 6.0])?;
/// let mut z = space.element()?;
/// space.lincomb(&mut z, 2.0, &x, 3.0, &y)?;
/// assert_eq!(z.to_vec()?, [14.0, 19.0, 24.0]);
/// # Ok::<(), fnspace_math::Error>(())
/// ```
#[derive(Clone)]
pub struct FnSpace<T: Element, D: Device = Cpu> {
    dim: usize,
    device: D,
    _marker: PhantomData<T>,
}

/// The real space `R^n` in single precision.
pub type RnSpace<D = Cpu> = FnSpace<f32, D>;

impl<T: Element> FnSpace<T, Cpu> {
    pub fn new(dim: usize) -> Result<Self> {
        Self::with_device(dim, Cpu)
    }
}

impl<T: Element, D: Device> FnSpace<T, D> {
    /// A space on the device's default instance, eg CUDA device 0.
    pub fn on_default_device(dim: usize) -> Result<Self>
    where
        D: DefaultDevice,
    {
        Error::check_enabled::<D>()?;
        let device = D::default_device().map_err(Error::unavailable::<D>)?;
        Self::with_device(dim, device)
    }

    pub fn with_device(dim: usize, device: D) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidDimension(dim));
        }
        Ok(Self {
            dim,
            device,
            _marker: PhantomData,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Whether `x` is an element of this space.
    pub fn contains(&self, x: &Vector<T, D>) -> bool {
        x.space() == self
    }

    pub(crate) fn check_member(&self, x: &Vector<T, D>) -> Result<()> {
        if self.contains(x) {
            Ok(())
        } else {
            Err(Error::NotInSpace {
                space: format!("{self:?}"),
                found: format!("{:?}", x.space()),
            })
        }
    }

    /// A new element. Its storage is zero-initialised.
    pub fn element(&self) -> Result<Vector<T, D>> {
        let data = Buffer::zeroed_in(self.dim, self.device.clone()).map_err(Error::device)?;
        Ok(Vector::from_parts(self.clone(), data))
    }

    /// A new element holding a copy of `values`.
    pub fn element_from(&self, values: &[T]) -> Result<Vector<T, D>> {
        let mut x = self.element()?;
        x.copy_from_host(values)?;
        Ok(x)
    }

    /// A new element holding `values` converted to `T`.
    ///
    /// Fails if a value cannot be represented, eg a negative number in an
    /// unsigned space.
    pub fn element_from_cast<U: ToPrimitive + Copy + fmt::Debug>(
        &self,
        values: &[U],
    ) -> Result<Vector<T, D>> {
        let values = values
            .iter()
            .map(|&v| {
                <T as NumCast>::from(v).ok_or_else(|| Error::Conversion {
                    value: format!("{v:?}"),
                    dtype: T::DTYPE,
                })
            })
            .collect::<Result<Vec<T>>>()?;
        self.element_from(&values)
    }

    /// An element viewing `dim` elements of foreign device memory. The memory
    /// is never freed by the returned vector; writes through either side are
    /// visible to the other.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `dim` elements of `T` on this
    /// space's device for as long as the vector is alive.
    pub unsafe fn element_from_raw(&self, ptr: DPtr<T, D>) -> Result<Vector<T, D>> {
        let ptr = NonNull::new(ptr).ok_or(Error::NullPointer)?;
        let data = Buffer::from_raw_parts(ptr, self.dim, self.device.clone());
        Ok(Vector::from_parts(self.clone(), data))
    }

    /// Wraps an existing buffer as an element of this space.
    pub fn element_from_buffer(&self, data: Buffer<T, D>) -> Result<Vector<T, D>> {
        if data.len() != self.dim {
            return Err(Error::LengthMismatch {
                expected: self.dim,
                found: data.len(),
            });
        }
        if data.device() != &self.device {
            return Err(Error::DeviceMismatch);
        }
        Ok(Vector::from_parts(self.clone(), data))
    }
}

impl<T: VectorKernels<D>, D: Device> FnSpace<T, D> {
    /// An element with every entry set to `value`.
    pub fn full(&self, value: T) -> Result<Vector<T, D>> {
        let mut x = self.element()?;
        x.fill(value)?;
        Ok(x)
    }

    pub fn zero(&self) -> Result<Vector<T, D>> {
        self.full(T::zero())
    }

    /// `z := a*x + b*y`
    pub fn lincomb(
        &self,
        z: &mut Vector<T, D>,
        a: T,
        x: &Vector<T, D>,
        b: T,
        y: &Vector<T, D>,
    ) -> Result<()> {
        self.check_member(z)?;
        self.check_member(x)?;
        self.check_member(y)?;
        let z = z.data_mut_ptr();
        unsafe { T::lincomb(&self.device, self.dim, a, x.data_ptr(), b, y.data_ptr(), z) }
            .map_err(Error::device)
    }

    /// Pointwise product, `z[i] := x[i] * y[i]`
    pub fn multiply(&self, z: &mut Vector<T, D>, x: &Vector<T, D>, y: &Vector<T, D>) -> Result<()> {
        self.check_member(z)?;
        self.check_member(x)?;
        self.check_member(y)?;
        let z = z.data_mut_ptr();
        unsafe { T::multiply(&self.device, self.dim, x.data_ptr(), y.data_ptr(), z) }
            .map_err(Error::device)
    }
}

impl<T: InnerProduct<D>, D: Device> FnSpace<T, D> {
    pub fn inner(&self, x: &Vector<T, D>, y: &Vector<T, D>) -> Result<T> {
        self.check_member(x)?;
        self.check_member(y)?;
        unsafe { T::dot(&self.device, self.dim, x.data_ptr(), y.data_ptr()) }
            .map_err(Error::device)
    }

    /// The euclidean norm. Computed directly rather than through [`FnSpace::inner`].
    pub fn norm(&self, x: &Vector<T, D>) -> Result<T> {
        self.check_member(x)?;
        unsafe { T::nrm2(&self.device, self.dim, x.data_ptr()) }.map_err(Error::device)
    }

    pub fn norm_squared(&self, x: &Vector<T, D>) -> Result<T> {
        let norm = self.norm(x)?;
        Ok(norm * norm)
    }

    /// `||x - y||`
    pub fn dist(&self, x: &Vector<T, D>, y: &Vector<T, D>) -> Result<T> {
        let mut diff = self.element()?;
        self.lincomb(&mut diff, T::one(), x, -T::one(), y)?;
        self.norm(&diff)
    }
}

impl<T: Element, U: Element, D: Device> PartialEq<FnSpace<U, D>> for FnSpace<T, D> {
    fn eq(&self, other: &FnSpace<U, D>) -> bool {
        self.dim == other.dim && T::DTYPE == U::DTYPE && self.device == other.device
    }
}

impl<T: Element, D: Device> fmt::Display for FnSpace<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Fn({})", D::NAME, self.dim)
    }
}

impl<T: Element, D: Device> fmt::Debug for FnSpace<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if T::DTYPE == DType::Float32 {
            write!(f, "{}Fn({})", D::NAME, self.dim)
        } else {
            write!(f, "{}Fn({}, '{}')", D::NAME, self.dim, T::DTYPE)
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use fnspace_sys::device::cpu::Cpu;

    use crate::error::Error;

    use super::{FnSpace, RnSpace};

    #[test]
    fn dim_and_equality() {
        let a = RnSpace::new(3).unwrap();
        assert_eq!(a.dim(), 3);
        assert_eq!(a, RnSpace::new(3).unwrap());
        assert_ne!(a, RnSpace::new(4).unwrap());
        assert_ne!(a, FnSpace::<f64>::new(3).unwrap());
        assert_eq!(FnSpace::<u8>::new(2).unwrap(), FnSpace::<u8>::new(2).unwrap());
    }

    #[test]
    fn default_cpu_space() {
        let space = RnSpace::<Cpu>::on_default_device(3).unwrap();
        assert_eq!(space, RnSpace::new(3).unwrap());
        assert!(matches!(
            FnSpace::<u8, Cpu>::on_default_device(0),
            Err(Error::InvalidDimension(0))
        ));
    }

    #[test]
    fn zero_dimension() {
        assert!(matches!(
            FnSpace::<i32>::new(0),
            Err(Error::InvalidDimension(0))
        ));
    }

    #[test]
    fn formatting() {
        let r3 = RnSpace::new(3).unwrap();
        assert_eq!(r3.to_string(), "CpuFn(3)");
        assert_eq!(format!("{r3:?}"), "CpuFn(3)");
        let z3 = FnSpace::<i32>::new(3).unwrap();
        assert_eq!(format!("{z3:?}"), "CpuFn(3, 'int32')");
    }

    #[test]
    fn lincomb() {
        let space = RnSpace::new(3).unwrap();
        let x = space.element_from(&[1.0, 2.0, 3.0]).unwrap();
        let y = space.element_from(&[4.0, 5.0, 6.0]).unwrap();
        let mut z = space.element().unwrap();
        space.lincomb(&mut z, 2.0, &x, 3.0, &y).unwrap();
        assert_eq!(z.to_vec().unwrap(), [14.0, 19.0, 24.0]);
    }

    #[test]
    fn lincomb_rejects_foreign_vectors() {
        let r3 = RnSpace::new(3).unwrap();
        let r4 = RnSpace::new(4).unwrap();
        let x = r4.zero().unwrap();
        let mut z = r3.element().unwrap();
        let err = r3.lincomb(&mut z, 1.0, &x, 1.0, &x).unwrap_err();
        assert!(matches!(err, Error::NotInSpace { .. }));
    }

    #[test]
    fn inner_and_norm() {
        let space = RnSpace::new(3).unwrap();
        let x = space.element_from(&[1.0, 2.0, 3.0]).unwrap();
        let y = space.element_from(&[3.0, 1.0, 5.0]).unwrap();
        assert_relative_eq!(space.inner(&x, &y).unwrap(), 20.0);

        let x = space.element_from(&[2.0, 3.0, 6.0]).unwrap();
        assert_relative_eq!(space.norm(&x).unwrap(), 7.0);
        assert_relative_eq!(
            space.norm_squared(&x).unwrap(),
            space.inner(&x, &x).unwrap(),
            max_relative = 1e-6
        );
        assert_relative_eq!(
            space.dist(&x, &y).unwrap(),
            6.0f32.sqrt(),
            max_relative = 1e-6
        );
    }

    #[test]
    fn multiply() {
        let space = FnSpace::<i16>::new(3).unwrap();
        let x = space.element_from(&[1, -2, 3]).unwrap();
        let y = space.element_from(&[4, 5, -6]).unwrap();
        let mut z = space.element().unwrap();
        space.multiply(&mut z, &x, &y).unwrap();
        assert_eq!(z.to_vec().unwrap(), [4, -10, -18]);
    }

    #[test]
    fn cast_construction() {
        let space = FnSpace::<u8>::new(3).unwrap();
        let x = space.element_from_cast(&[1i64, 2, 255]).unwrap();
        assert_eq!(x.to_vec().unwrap(), [1, 2, 255]);
        let err = space.element_from_cast(&[1i64, -2, 3]).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));
    }

    #[test]
    fn full_and_zero() {
        let space = FnSpace::<f64>::new(4).unwrap();
        assert_eq!(space.full(1.5).unwrap().to_vec().unwrap(), [1.5; 4]);
        assert_eq!(space.zero().unwrap().to_vec().unwrap(), [0.0; 4]);
    }

    #[test]
    fn raw_pointer_aliases() {
        let space = FnSpace::<f32>::new(3).unwrap();
        let mut host = vec![1.0f32, 2.0, 3.0];
        {
            let mut x = unsafe { space.element_from_raw(host.as_mut_ptr()) }.unwrap();
            assert!(!x.data().is_owned());
            x.set(0, 10.0).unwrap();
        }
        assert_eq!(host, [10.0, 2.0, 3.0]);
        assert!(matches!(
            unsafe { space.element_from_raw(std::ptr::null_mut()) },
            Err(Error::NullPointer)
        ));
    }
}

use std::fmt;

use fnspace_sys::{
    device::{cpu::Cpu, Device},
    ptr::DPtr,
    Buffer, DType, Element,
};

use crate::{
    error::{Error, Result},
    kernels::VectorKernels,
    slice::{Slice, SliceIndices},
    space::FnSpace,
};

/// An element of an [`FnSpace`], owning (or borrowing) one device buffer.
pub struct Vector<T: Element, D: Device = Cpu> {
    space: FnSpace<T, D>,
    data: Buffer<T, D>,
}

impl<T: Element, D: Device> Vector<T, D> {
    pub(crate) fn from_parts(space: FnSpace<T, D>, data: Buffer<T, D>) -> Self {
        debug_assert_eq!(space.dim(), data.len());
        Self { space, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false, spaces have a positive dimension.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn space(&self) -> &FnSpace<T, D> {
        &self.space
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Size in bytes of one element.
    pub fn itemsize(&self) -> usize {
        T::DTYPE.itemsize()
    }

    pub fn data(&self) -> &Buffer<T, D> {
        &self.data
    }

    /// Raw device pointer to the first element, for handing to other native code.
    pub fn data_ptr(&self) -> DPtr<T, D> {
        self.data.as_ptr()
    }

    pub fn data_mut_ptr(&mut self) -> DPtr<T, D> {
        self.data.as_mut_ptr()
    }

    pub fn into_buffer(self) -> Buffer<T, D> {
        self.data
    }

    /// Overwrites all elements from host memory.
    pub fn copy_from_host(&mut self, values: &[T]) -> Result<()> {
        self.check_len(values.len())?;
        self.data.write_from_host(0, values).map_err(Error::device)
    }

    /// Copies all elements into host memory.
    pub fn copy_to_host(&self, out: &mut [T]) -> Result<()> {
        self.check_len(out.len())?;
        self.data.read_to_host(0, out).map_err(Error::device)
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.data.to_host_vec().map_err(Error::device)
    }

    /// A new vector in the same space holding a copy of this one.
    pub fn try_clone(&self) -> Result<Self> {
        let data = self.data.try_clone().map_err(Error::device)?;
        Ok(Self::from_parts(self.space.clone(), data))
    }

    /// `self := other`
    pub fn assign(&mut self, other: &Self) -> Result<()> {
        self.space.check_member(other)?;
        self.data.copy_from_buffer(&other.data).map_err(Error::device)
    }

    fn check_len(&self, found: usize) -> Result<()> {
        if found == self.len() {
            Ok(())
        } else {
            Err(Error::LengthMismatch {
                expected: self.len(),
                found,
            })
        }
    }

    fn wrap_index(&self, index: isize) -> Result<usize> {
        let len = self.len();
        let wrapped = if index < 0 {
            index + len as isize
        } else {
            index
        };
        if (0..len as isize).contains(&wrapped) {
            Ok(wrapped as usize)
        } else {
            Err(Error::IndexOutOfBounds { index, len })
        }
    }

    /// Reads the contiguous range covering every position of `idx`.
    fn read_covering(&self, idx: &SliceIndices) -> Result<(usize, Vec<T>)> {
        let first = idx.start as usize;
        let last = idx.iter().last().unwrap_or(first);
        let (lo, hi) = (first.min(last), first.max(last));
        let mut tmp = vec![T::zero(); hi - lo + 1];
        self.data.read_to_host(lo, &mut tmp).map_err(Error::device)?;
        Ok((lo, tmp))
    }

    /// Reads a single element, negative indices counting from the end.
    ///
    /// This is a host/device round trip per call, meant for tests and
    /// debugging only. Use [`Vector::copy_to_host`] for bulk reads.
    pub fn get(&self, index: isize) -> Result<T> {
        let i = self.wrap_index(index)?;
        tracing::trace!(index = i, "slow path element read");
        let mut out = [T::zero()];
        self.data.read_to_host(i, &mut out).map_err(Error::device)?;
        Ok(out[0])
    }

    /// Writes a single element. Same cost caveats as [`Vector::get`].
    pub fn set(&mut self, index: isize, value: T) -> Result<()> {
        let i = self.wrap_index(index)?;
        tracing::trace!(index = i, "slow path element write");
        self.data.write_from_host(i, &[value]).map_err(Error::device)
    }

    /// Reads the elements selected by `slice`.
    ///
    /// Copies the contiguous range spanned by the slice to the host, so a
    /// strided slice costs as much as its full span. Testing and interop only.
    pub fn get_slice(&self, slice: impl Into<Slice>) -> Result<Vec<T>> {
        let idx = slice.into().indices(self.len())?;
        if idx.is_empty() {
            return Ok(Vec::new());
        }
        tracing::trace!(?idx, "slow path slice read");
        let (lo, tmp) = self.read_covering(&idx)?;
        Ok(idx.iter().map(|p| tmp[p - lo]).collect())
    }

    /// Writes `values` to the elements selected by `slice`. `values` must
    /// have exactly as many entries as the slice selects.
    ///
    /// Strided slices read back their full span, patch it and write it out
    /// again. Testing and interop only.
    pub fn set_slice(&mut self, slice: impl Into<Slice>, values: &[T]) -> Result<()> {
        let idx = slice.into().indices(self.len())?;
        if idx.len() != values.len() {
            return Err(Error::LengthMismatch {
                expected: idx.len(),
                found: values.len(),
            });
        }
        if idx.is_empty() {
            return Ok(());
        }
        tracing::trace!(?idx, "slow path slice write");
        if idx.step == 1 {
            return self
                .data
                .write_from_host(idx.start as usize, values)
                .map_err(Error::device);
        }
        let (lo, mut tmp) = self.read_covering(&idx)?;
        for (p, &v) in idx.iter().zip(values) {
            tmp[p - lo] = v;
        }
        self.data.write_from_host(lo, &tmp).map_err(Error::device)
    }
}

impl<T: VectorKernels<D>, D: Device> Vector<T, D> {
    /// Sets every element to `value`.
    pub fn fill(&mut self, value: T) -> Result<()> {
        let n = self.len();
        let z = self.data.as_mut_ptr();
        unsafe { T::fill(self.space.device(), n, value, z) }.map_err(Error::device)
    }

    /// `self := self + a*x`
    pub fn axpy(&mut self, a: T, x: &Self) -> Result<()> {
        self.space.check_member(x)?;
        let n = self.len();
        let z = self.data.as_mut_ptr();
        unsafe { T::lincomb(self.space.device(), n, T::one(), z, a, x.data_ptr(), z) }
            .map_err(Error::device)
    }

    /// `self := a*self`
    pub fn scale(&mut self, a: T) -> Result<()> {
        let n = self.len();
        let z = self.data.as_mut_ptr();
        unsafe { T::lincomb(self.space.device(), n, a, z, T::zero(), z, z) }.map_err(Error::device)
    }
}

/// Writes `[a, b, c]`, or `[a, b, c, ..., x, y, z]` past six elements.
fn write_array1d<T: Element, D: Device>(
    f: &mut fmt::Formatter<'_>,
    x: &Vector<T, D>,
) -> fmt::Result {
    let n = x.len();
    let values = if n <= 6 {
        x.to_vec().map_err(|_| fmt::Error)?
    } else {
        let mut ends = vec![T::zero(); 6];
        let (head, tail) = ends.split_at_mut(3);
        x.data.read_to_host(0, head).map_err(|_| fmt::Error)?;
        x.data.read_to_host(n - 3, tail).map_err(|_| fmt::Error)?;
        ends
    };

    f.write_str("[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if n > 6 && i == 3 {
            f.write_str("..., ")?;
        }
        write!(f, "{v:?}")?;
    }
    f.write_str("]")
}

impl<T: Element, D: Device> fmt::Display for Vector<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_array1d(f, self)
    }
}

impl<T: Element, D: Device> fmt::Debug for Vector<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}.element(", self.space)?;
        write_array1d(f, self)?;
        f.write_str(")")
    }
}

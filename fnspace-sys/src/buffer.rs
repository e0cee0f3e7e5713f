use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use crate::{
    device::{cpu::Cpu, DefaultDevice, Device},
    dtype::DType,
    element::Element,
    ptr::{DPtr, NonNull},
};

/// A fixed length run of elements living on device `D`.
///
/// Buffers either own their allocation, in which case it is released on drop,
/// or borrow externally managed memory handed in through [`Buffer::from_raw_parts`].
pub struct Buffer<T: Element, D: Device = Cpu> {
    ptr: NonNull<T, D>,
    len: usize,
    device: D,
    owned: bool,
}

impl<T: Element, D: Device> Drop for Buffer<T, D> {
    fn drop(&mut self) {
        if self.owned {
            unsafe { self.device.deallocate(self.ptr, self.len) }
        }
    }
}

// Safety: the buffer is the unique handle to its allocation (or the caller of
// `from_raw_parts` vouched for the memory) and elements are plain data.
unsafe impl<T: Element, D: Device> Send for Buffer<T, D> {}
unsafe impl<T: Element, D: Device> Sync for Buffer<T, D> {}

impl<T: Element, D: Device> Buffer<T, D> {
    pub fn zeroed_in(len: usize, device: D) -> Result<Self, D::Error> {
        let ptr = device.allocate_zeroed(len)?;
        Ok(Self {
            ptr,
            len,
            device,
            owned: true,
        })
    }

    pub fn zeroed(len: usize) -> Result<Self, D::Error>
    where
        D: DefaultDevice,
    {
        Self::zeroed_in(len, D::default_device()?)
    }

    pub fn copy_from_host_in(slice: &[T], device: D) -> Result<Self, D::Error> {
        let mut buf = Self::zeroed_in(slice.len(), device)?;
        buf.write_from_host(0, slice)?;
        Ok(buf)
    }

    pub fn copy_from_host(slice: &[T]) -> Result<Self, D::Error>
    where
        D: DefaultDevice,
    {
        Self::copy_from_host_in(slice, D::default_device()?)
    }

    /// Wraps externally managed device memory without taking ownership.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` elements on `device`
    /// for the whole lifetime of the returned buffer, and nothing else may
    /// write to it while the buffer is alive.
    pub unsafe fn from_raw_parts(ptr: NonNull<T, D>, len: usize, device: D) -> Self {
        Self {
            ptr,
            len,
            device,
            owned: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Whether the allocation is released when this buffer is dropped.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn as_ptr(&self) -> DPtr<T, D> {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> DPtr<T, D> {
        self.ptr.as_ptr()
    }

    pub fn as_non_null(&self) -> NonNull<T, D> {
        self.ptr
    }

    fn offset_ptr(&self, offset: usize) -> NonNull<T, D> {
        use crate::ptr::DevicePtr;
        // Safety: callers check that offset is in bounds, so the result is non-null
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset)) }
    }

    /// Copies `from` into the buffer starting at element `offset`.
    ///
    /// # Panics
    /// If `offset + from.len()` is larger than the buffer.
    pub fn write_from_host(&mut self, offset: usize, from: &[T]) -> Result<(), D::Error> {
        assert!(
            offset.checked_add(from.len()).map_or(false, |end| end <= self.len),
            "write of {} elements at offset {offset} is out of range for a buffer of length {}",
            from.len(),
            self.len,
        );
        if from.is_empty() {
            return Ok(());
        }
        unsafe { self.device.copy_from_host(from, self.offset_ptr(offset)) }
    }

    /// Fills `to` with elements read from the buffer starting at `offset`.
    ///
    /// # Panics
    /// If `offset + to.len()` is larger than the buffer.
    pub fn read_to_host(&self, offset: usize, to: &mut [T]) -> Result<(), D::Error> {
        assert!(
            offset.checked_add(to.len()).map_or(false, |end| end <= self.len),
            "read of {} elements at offset {offset} is out of range for a buffer of length {}",
            to.len(),
            self.len,
        );
        if to.is_empty() {
            return Ok(());
        }
        unsafe { self.device.copy_to_host(self.offset_ptr(offset), to) }
    }

    pub fn to_host_vec(&self) -> Result<Vec<T>, D::Error> {
        let mut out = vec![T::zero(); self.len];
        self.read_to_host(0, &mut out)?;
        Ok(out)
    }

    /// Copies every element of `other` into this buffer.
    ///
    /// # Panics
    /// If the lengths differ.
    pub fn copy_from_buffer(&mut self, other: &Self) -> Result<(), D::Error> {
        assert_eq!(self.len, other.len, "buffer lengths differ");
        if self.ptr == other.ptr {
            return Ok(());
        }
        unsafe { self.device.copy(other.ptr, self.ptr, self.len) }
    }

    /// Allocates a new owned buffer on the same device holding a copy of the data.
    pub fn try_clone(&self) -> Result<Self, D::Error> {
        let mut new = Self::zeroed_in(self.len, self.device.clone())?;
        new.copy_from_buffer(self)?;
        Ok(new)
    }
}

impl<T: Element> Deref for Buffer<T, Cpu> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Element> DerefMut for Buffer<T, Cpu> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Element, D: Device> fmt::Debug for Buffer<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("dtype", &T::DTYPE)
            .field("len", &self.len)
            .field("device", &self.device)
            .field("owned", &self.owned)
            .finish()
    }
}

use std::{fmt::Debug, marker::PhantomData};

use crate::device::Device;

use super::DevicePtr;

/// A non-null pointer into the memory of device `D`.
pub struct NonNull<T, D: Device> {
    inner: std::ptr::NonNull<T>,
    _marker: PhantomData<D>,
}

impl<T, D: Device> Debug for NonNull<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NonNull")
            .field(&D::NAME)
            .field(&self.inner)
            .finish()
    }
}

impl<T, D: Device> Clone for NonNull<T, D> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, D: Device> Copy for NonNull<T, D> {}

impl<T, D: Device> PartialEq for NonNull<T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T, D: Device> NonNull<T, D> {
    pub fn new(ptr: D::Ptr<T>) -> Option<Self> {
        let inner = std::ptr::NonNull::new(ptr.as_raw())?;
        Some(Self {
            inner,
            _marker: PhantomData,
        })
    }

    /// # Safety
    /// ptr must not be null
    pub unsafe fn new_unchecked(ptr: D::Ptr<T>) -> Self {
        let inner = std::ptr::NonNull::new_unchecked(ptr.as_raw());
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// A well aligned pointer that must never be handed to the device.
    /// Used as the base of empty buffers.
    pub fn dangling() -> Self {
        Self {
            inner: std::ptr::NonNull::dangling(),
            _marker: PhantomData,
        }
    }

    pub fn as_ptr(self) -> D::Ptr<T> {
        D::Ptr::from_raw(self.inner.as_ptr())
    }

    pub fn cast<U>(self) -> NonNull<U, D> {
        let Self { inner, _marker } = self;
        NonNull {
            inner: inner.cast(),
            _marker,
        }
    }
}

impl<T, D: Device> From<NonNull<T, D>> for std::ptr::NonNull<T> {
    fn from(ptr: NonNull<T, D>) -> Self {
        ptr.inner
    }
}

use std::fmt::Debug;

use crate::{backend::Backend, element::Element, ptr::NonNull};

pub use crate::ptr::DevicePtr;

pub mod cpu;
#[cfg(feature = "cuda")]
pub mod cuda;

/// A place element buffers can live in.
///
/// A device value is a cheap handle: cloning it never duplicates the
/// underlying context. Two handles compare equal when they refer to the same
/// physical device.
pub trait Device: Clone + Debug + PartialEq + Send + Sync + 'static {
    #![allow(clippy::missing_safety_doc)]

    type Ptr<T>: DevicePtr<T>;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short name used when displaying spaces, eg `Cpu` or `Cuda`.
    const NAME: &'static str;

    const BACKEND: Backend;

    /// Allocates `len` zero-initialised elements.
    fn allocate_zeroed<T: Element>(&self, len: usize) -> Result<NonNull<T, Self>, Self::Error>;

    /// `ptr` must come from [`Device::allocate_zeroed`] on this device with the same `len`.
    unsafe fn deallocate<T: Element>(&self, ptr: NonNull<T, Self>, len: usize);

    /// `to` must be valid for `from.len()` writes.
    unsafe fn copy_from_host<T: Element>(
        &self,
        from: &[T],
        to: NonNull<T, Self>,
    ) -> Result<(), Self::Error>;

    /// `from` must be valid for `to.len()` reads.
    unsafe fn copy_to_host<T: Element>(
        &self,
        from: NonNull<T, Self>,
        to: &mut [T],
    ) -> Result<(), Self::Error>;

    /// Both pointers must be valid for `len` elements and must not overlap.
    unsafe fn copy<T: Element>(
        &self,
        from: NonNull<T, Self>,
        to: NonNull<T, Self>,
        len: usize,
    ) -> Result<(), Self::Error>;
}

/// Devices that can be constructed without any configuration.
pub trait DefaultDevice: Device {
    fn default_device() -> Result<Self, Self::Error>;
}

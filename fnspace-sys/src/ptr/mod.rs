mod non_null;

pub use non_null::NonNull;

use crate::device::Device;

pub type DPtr<T, D> = <D as Device>::Ptr<T>;

/// A typed pointer into the memory of some device.
///
/// Device pointers are only ever dereferenced by the owning device, so the
/// host side only needs to move them around and offset them.
pub trait DevicePtr<T>: Copy {
    fn as_raw(self) -> *mut T;
    fn from_raw(ptr: *mut T) -> Self;

    /// Offsets the pointer by `count` elements. Never dereferences.
    fn add(self, count: usize) -> Self {
        Self::from_raw(self.as_raw().wrapping_add(count))
    }
}

impl<T> DevicePtr<T> for *mut T {
    fn as_raw(self) -> *mut T {
        self
    }

    fn from_raw(ptr: *mut T) -> Self {
        ptr
    }
}

use std::alloc::{alloc_zeroed, dealloc, Layout};

use crate::{backend::Backend, element::Element, ptr::NonNull};

use super::{DefaultDevice, Device};

/// Host memory, allocated through the global allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cpu;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CpuError {
    #[error("failed to allocate {bytes} bytes")]
    AllocFailed { bytes: usize },
    #[error("a buffer of {len} elements does not fit in the address space")]
    CapacityOverflow { len: usize },
}

impl Device for Cpu {
    type Ptr<T> = *mut T;
    type Error = CpuError;

    const NAME: &'static str = "Cpu";
    const BACKEND: Backend = Backend::Cpu;

    fn allocate_zeroed<T: Element>(&self, len: usize) -> Result<NonNull<T, Self>, CpuError> {
        if len == 0 {
            return Ok(NonNull::dangling());
        }
        let layout = Layout::array::<T>(len).map_err(|_| CpuError::CapacityOverflow { len })?;
        tracing::trace!(len, bytes = layout.size(), dtype = %T::DTYPE, "cpu allocation");

        // Safety: layout has a non-zero size since len > 0 and no element type is a ZST
        let ptr = unsafe { alloc_zeroed(layout) };
        NonNull::new(ptr.cast()).ok_or(CpuError::AllocFailed {
            bytes: layout.size(),
        })
    }

    unsafe fn deallocate<T: Element>(&self, ptr: NonNull<T, Self>, len: usize) {
        if len != 0 {
            let layout = Layout::from_size_align_unchecked(
                std::mem::size_of::<T>() * len,
                std::mem::align_of::<T>(),
            );
            dealloc(ptr.as_ptr().cast(), layout);
        }
    }

    unsafe fn copy_from_host<T: Element>(
        &self,
        from: &[T],
        to: NonNull<T, Self>,
    ) -> Result<(), CpuError> {
        if !from.is_empty() {
            std::ptr::copy(from.as_ptr(), to.as_ptr(), from.len());
        }
        Ok(())
    }

    unsafe fn copy_to_host<T: Element>(
        &self,
        from: NonNull<T, Self>,
        to: &mut [T],
    ) -> Result<(), CpuError> {
        if !to.is_empty() {
            std::ptr::copy(from.as_ptr(), to.as_mut_ptr(), to.len());
        }
        Ok(())
    }

    unsafe fn copy<T: Element>(
        &self,
        from: NonNull<T, Self>,
        to: NonNull<T, Self>,
        len: usize,
    ) -> Result<(), CpuError> {
        if len != 0 {
            std::ptr::copy_nonoverlapping(from.as_ptr(), to.as_ptr(), len);
        }
        Ok(())
    }
}

impl DefaultDevice for Cpu {
    fn default_device() -> Result<Self, CpuError> {
        Ok(Cpu)
    }
}

#[cfg(test)]
mod tests {
    use crate::device::Device;

    use super::{Cpu, CpuError};

    #[test]
    fn zeroed() {
        let ptr = Cpu.allocate_zeroed::<f64>(16).unwrap();
        let mut out = [1.0; 16];
        unsafe {
            Cpu.copy_to_host(ptr, &mut out).unwrap();
            Cpu.deallocate(ptr, 16);
        }
        assert_eq!(out, [0.0; 16]);
    }

    #[test]
    fn empty_allocation_is_dangling() {
        let ptr = Cpu.allocate_zeroed::<u8>(0).unwrap();
        unsafe { Cpu.deallocate(ptr, 0) };
    }

    #[test]
    fn overflow() {
        let err = Cpu.allocate_zeroed::<u64>(usize::MAX).unwrap_err();
        assert_eq!(err, CpuError::CapacityOverflow { len: usize::MAX });
    }
}

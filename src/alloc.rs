use core::ptr::NonNull;
use std::alloc::Layout;

use thiserror::Error;

/// Error returned when an allocator cannot provide a block for the requested layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failed to allocate block of {} bytes (align {})", .layout.size(), .layout.align())]
pub struct AllocError {
    /// The layout the failed request was made with.
    pub layout: Layout,
}

/// Source of raw memory blocks for the types in this crate.
///
/// This is the full extent of the allocator collaboration: obtain a block for a
/// layout, give a block back. Callers never pass zero-sized layouts; containers of
/// zero-sized types use dangling pointers and skip the allocator entirely.
pub trait BlockAlloc {
    /// Allocate a block of memory fitting `layout`.
    ///
    /// # Safety
    ///
    /// `layout` must have non-zero size.
    unsafe fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Deallocate a block of memory.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the same
    /// `layout`, and must not have been deallocated before.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process heap, via `std::alloc`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

impl BlockAlloc for Heap {
    unsafe fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0);
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError { layout })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

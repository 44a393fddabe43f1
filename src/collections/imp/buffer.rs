use core::{
    cmp,
    marker::PhantomData,
    mem::size_of,
    ptr::{self, NonNull},
};
use std::alloc::Layout;

use crate::{
    alloc::{AllocError, BlockAlloc},
    collections::{ReserveStrategy, TryReserveError},
};

/// Low level utility for more ergonomically allocating, reallocating, and deallocating
/// a buffer of memory from a [`BlockAlloc`] without having to worry about all the
/// corner cases involved. In particular:
///
/// - Produces a dangling pointer on zero-sized types.
/// - Produces a dangling pointer on zero-length allocations.
/// - Avoids freeing dangling pointers.
/// - Catches all overflows in capacity computations (promotes them to "capacity overflow" errors).
/// - Guards against overflowing your length.
///
/// This type does not in any way inspect the memory it manages. When dropped it *will*
/// free its memory, but it *won't* try to drop its contents. It is up to the user of
/// `RawBuf` to handle the actual things *stored* inside of it.
///
/// Note that a zero-sized type never allocates, so `capacity()` always returns
/// `usize::MAX` for one.
pub(crate) struct RawBuf<T, A: BlockAlloc, R: ReserveStrategy> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
    _strategy: PhantomData<R>,
}

impl<T, A: BlockAlloc, R: ReserveStrategy> RawBuf<T, A, R> {
    /// Tiny buffers are dumb, so like std's `RawVec`, skip to:
    /// - 8 if the element size is 1, because of how heap allocators are likely to round up a request of 8 bytes to at least 8 bytes (if not 16).
    /// - 4 if the element is moderate-sized (<= 1KiB, which could fit nicely in a single OS memory page)
    /// - 1 otherwise, to avoid wasting too much space for very short buffers.
    pub const MIN_NON_ZERO_CAP: usize = if size_of::<T>() == 1 {
        8
    } else if size_of::<T>() <= 1024 {
        4
    } else {
        1
    };

    /// Creates the biggest possible `RawBuf` without allocating.
    /// If `T` has a non-zero size, this makes a `RawBuf` with a capacity of `0`.
    /// If `T` is zero-sized, it makes a `RawBuf` with a capacity of `usize::MAX`.
    /// Useful for implementing delayed allocation.
    #[must_use]
    pub const fn new_in(alloc: A) -> Self {
        Self { ptr: NonNull::dangling(), cap: 0, alloc, _strategy: PhantomData }
    }

    /// Creates a `RawBuf` with exactly the capacity and alignment requirements for a
    /// `[T; capacity]`. This is equivalent to calling `RawBuf::new_in` when `capacity`
    /// is `0` or `T` is zero-sized.
    ///
    /// # Panics
    ///
    /// Panics if the requested capacity exceeds `isize::MAX` bytes.
    ///
    /// # Aborts
    ///
    /// Aborts on OOM.
    #[must_use]
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        match Self::try_with_capacity_in(capacity, alloc) {
            Ok(buf) => buf,
            Err(err) => handle_error(err),
        }
    }

    /// The same as `with_capacity_in`, but returns on errors instead of panicking or aborting.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        // Don't allocate here, because `drop` will not deallocate when capacity is 0.
        if size_of::<T>() == 0 || capacity == 0 {
            return Ok(Self::new_in(alloc));
        }

        let layout = layout_for::<T>(capacity)?;
        let ptr = unsafe { alloc.allocate(layout)? }.cast();
        Ok(Self { ptr, cap: capacity, alloc, _strategy: PhantomData })
    }

    /// Get the capacity of the allocation.
    ///
    /// This will always be `usize::MAX` if `T` is zero-sized.
    pub const fn capacity(&self) -> usize {
        if size_of::<T>() == 0 {
            usize::MAX
        } else {
            self.cap
        }
    }

    /// Get a raw pointer to the start of the allocation.
    /// Note that this is a dangling pointer when either `capacity() == 0` or `T` is zero-sized.
    /// In the former case, you must be careful.
    pub const fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Get the allocator backing the buffer.
    pub const fn alloc(&self) -> &A {
        &self.alloc
    }

    pub const fn current_memory(&self) -> Option<(NonNull<u8>, Layout)> {
        if size_of::<T>() == 0 || self.cap == 0 {
            None
        } else {
            // This memory has already been allocated, so the size computations below
            // cannot overflow.
            unsafe {
                let size = size_of::<T>().unchecked_mul(self.cap);
                let layout = Layout::from_size_align_unchecked(size, core::mem::align_of::<T>());
                Some((self.ptr.cast(), layout))
            }
        }
    }

    /// Ensures that the buffer contains at least enough space to hold `len + additional`
    /// elements. If it doesn't already have enough capacity, will reallocate enough
    /// space plus comfortable slack space to get amortized *O*(1) behavior.
    ///
    /// `len` may not exceed `self.capacity()`.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds `isize::MAX` bytes.
    ///
    /// # Aborts
    ///
    /// Aborts on OOM.
    pub fn reserve(&mut self, len: usize, additional: usize) {
        // Callers expect this function to be very cheap when there is already sufficient capacity.
        // Therefore, we move all the resizing and error-handling logic behind a call,
        // while making sure that this function is likely to be inlined as just a comparison and a call if the comparison fails.
        #[cold]
        fn do_reserve_and_handle<T, A: BlockAlloc, R: ReserveStrategy>(
            slf: &mut RawBuf<T, A, R>,
            len: usize,
            additional: usize,
        ) {
            if let Err(err) = slf.grow_amortized(len, additional) {
                handle_error(err);
            }
        }

        if self.needs_to_grow(len, additional) {
            do_reserve_and_handle(self, len, additional);
        }
    }

    /// A specialized version of `self.reserve(len, 1)`, which requires the caller to ensure `len == self.capacity()`.
    pub fn grow_one(&mut self, len: usize) {
        if let Err(err) = self.grow_amortized(len, 1) {
            handle_error(err);
        }
    }

    /// The same as `reserve`, but returns on errors instead of panicking or aborting.
    pub fn try_reserve(&mut self, len: usize, additional: usize) -> Result<(), TryReserveError> {
        if self.needs_to_grow(len, additional) {
            self.grow_amortized(len, additional)?;
        }
        Ok(())
    }

    //--------------------------------------------------------------

    /// Returns if the buffer needs to grow to fulfill the needed extra capacity.
    /// Mainly used to make inlining reserve-calls possible without inlining `grow`.
    fn needs_to_grow(&self, len: usize, additional: usize) -> bool {
        additional > self.capacity().wrapping_sub(len)
    }

    fn grow_amortized(&mut self, len: usize, additional: usize) -> Result<(), TryReserveError> {
        debug_assert!(additional > 0);

        if size_of::<T>() == 0 {
            // Since we return a capacity of `usize::MAX` when the element size is 0,
            // getting to here necessarily means the `RawBuf` is overfull.
            return Err(TryReserveError::CapacityOverflow);
        }

        let required_cap = len.checked_add(additional).ok_or(TryReserveError::CapacityOverflow)?;
        let new_cap = match R::calculate(self.cap, required_cap) {
            Ok(cap) => cap,
            Err(()) => return Err(TryReserveError::CapacityOverflow),
        };
        let new_cap = cmp::max(new_cap, Self::MIN_NON_ZERO_CAP);

        unsafe { self.finalize_grow(new_cap, len) }
    }

    /// # Safety
    ///
    /// The first `len` elements of the buffer must be initialized, as they are copied
    /// into the new allocation.
    unsafe fn finalize_grow(&mut self, new_cap: usize, len: usize) -> Result<(), TryReserveError> {
        debug_assert!(new_cap >= self.cap);

        let new_layout = layout_for::<T>(new_cap)?;
        unsafe {
            let new_ptr = self.alloc.allocate(new_layout)?.cast::<T>();
            if let Some((old_ptr, old_layout)) = self.current_memory() {
                ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), len);
                self.alloc.deallocate(old_ptr, old_layout);
            }
            self.ptr = new_ptr;
            self.cap = new_cap;
        }

        Ok(())
    }
}

impl<T, A: BlockAlloc, R: ReserveStrategy> Drop for RawBuf<T, A, R> {
    fn drop(&mut self) {
        if let Some((ptr, layout)) = self.current_memory() {
            unsafe { self.alloc.deallocate(ptr, layout) };
        }
    }
}

fn layout_for<T>(capacity: usize) -> Result<Layout, TryReserveError> {
    let layout = Layout::array::<T>(capacity).map_err(|_| TryReserveError::CapacityOverflow)?;
    if layout.size() > isize::MAX as usize {
        return Err(TryReserveError::CapacityOverflow);
    }
    Ok(layout)
}

/// Central function for reserve error handling.
#[cold]
pub(crate) fn handle_error(e: TryReserveError) -> ! {
    match e {
        TryReserveError::CapacityOverflow => capacity_overflow(),
        TryReserveError::Alloc(AllocError { layout }) => std::alloc::handle_alloc_error(layout),
    }
}

fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

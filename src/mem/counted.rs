use core::{
    borrow::Borrow,
    cell::Cell,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::Deref,
    ptr::{self, NonNull},
};
use std::{
    alloc::Layout,
    io::Write,
    process,
};

use static_assertions::{assert_not_impl_any, const_assert};

use crate::alloc::{AllocError, BlockAlloc, Heap};

/// Highest reference count a [`Counted`] block will hold.
///
/// A clone finding the count already at this value aborts the process. The threshold
/// sits a full factor of two below `usize::MAX`, so there is no way to creep up on the
/// wrap-around point: even the pathological case of a handle being cloned and leaked
/// in a loop hits the abort with half the counter's range to spare.
pub const MAX_COUNT: usize = isize::MAX as usize;

const_assert!(MAX_COUNT < usize::MAX);

struct CountedInner<T> {
    count: Cell<usize>,
    value: T,
}

/// A shared-ownership counted pointer to a heap-allocated payload.
///
/// Cloning a `Counted` hands out another handle to the same block and bumps the
/// block's reference count; dropping a handle decrements it, and the handle that
/// brings the count to zero destroys the payload and releases the block through the
/// allocator it was created with.
///
/// # Counting is single-threaded
///
/// The count is a plain [`Cell`], not an atomic: `Counted` is neither `Send` nor
/// `Sync` and can never cross a thread boundary, so unsynchronized counting is sound.
///
/// # Skipped destructors and the overflow guard
///
/// Forgetting a handle (via [`mem::forget`] or otherwise) means its decrement never
/// happens: the block is leaked, which is safe — an artificially high count keeps the
/// payload alive, it never frees it early. What must *not* happen is the count
/// wrapping around to a small value, because a wrapped count reaches zero while
/// handles still exist and the payload would be freed under them. Clone therefore
/// checks the count against [`MAX_COUNT`] first and aborts the process if another
/// handle would pass it. Reaching that threshold requires deliberately leaking handles
/// on a massive scale (each live handle occupies memory; `isize::MAX` of them do not
/// fit in an address space), so by the time the guard fires the program is already
/// known to be discarding handles without dropping them — there is no sensible state
/// to recover into, and no error value is offered.
///
/// [`mem::forget`]: core::mem::forget
pub struct Counted<T, A: BlockAlloc = Heap> {
    ptr: NonNull<CountedInner<T>>,
    alloc: A,
    _phantom: PhantomData<CountedInner<T>>,
}

// A `Cell` count shared between handles must never be touched from two threads.
assert_not_impl_any!(Counted<u64>: Send, Sync);

impl<T> Counted<T> {
    /// Create a new `Counted` on the process heap, with a count of 1.
    ///
    /// # Aborts
    ///
    /// Aborts on OOM.
    #[inline]
    pub fn new(value: T) -> Self {
        Self::new_in(value, Heap)
    }
}

impl<T, A: BlockAlloc> Counted<T, A> {
    /// Create a new `Counted` in the given allocator, with a count of 1.
    ///
    /// # Aborts
    ///
    /// Aborts on OOM.
    pub fn new_in(value: T, alloc: A) -> Self {
        match Self::try_new_in(value, alloc) {
            Ok(this) => this,
            Err(AllocError { layout }) => std::alloc::handle_alloc_error(layout),
        }
    }

    /// Try to create a new `Counted` in the given allocator, with a count of 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot provide the block.
    pub fn try_new_in(value: T, alloc: A) -> Result<Self, AllocError> {
        // The count field means the block is never zero-sized, even for a ZST payload.
        let layout = Layout::new::<CountedInner<T>>();
        let ptr = unsafe { alloc.allocate(layout)? }.cast::<CountedInner<T>>();
        unsafe {
            ptr.as_ptr().write(CountedInner { count: Cell::new(1), value });
        }
        Ok(Self { ptr, alloc, _phantom: PhantomData })
    }

    /// Get the reference count of the block `this` points at.
    #[inline]
    pub fn count(this: &Self) -> usize {
        this.inner().count.get()
    }

    /// Check if two `Counted`s point at the same block.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        ptr::eq(this.ptr.as_ptr(), other.ptr.as_ptr())
    }

    /// Get a mutable reference to the value, when `this` is the only handle to the block.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if Self::count(this) == 1 {
            Some(unsafe { &mut this.ptr.as_mut().value })
        } else {
            None
        }
    }

    /// Return the inner value if `this` is the only handle to the block, otherwise
    /// return the `Counted` that was passed in.
    pub fn try_unwrap(this: Self) -> Result<T, Self> {
        if Self::count(&this) != 1 {
            return Err(this);
        }

        let this = ManuallyDrop::new(this);
        unsafe {
            let value = ptr::read(ptr::addr_of!((*this.ptr.as_ptr()).value));
            let alloc = ptr::read(&this.alloc);
            alloc.deallocate(this.ptr.cast(), Layout::new::<CountedInner<T>>());
            Ok(value)
        }
    }

    #[inline]
    fn inner(&self) -> &CountedInner<T> {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, A: BlockAlloc + Clone> Clone for Counted<T, A> {
    /// Clone the handle, increasing the count.
    ///
    /// # Aborts
    ///
    /// Aborts the process if the count is at [`MAX_COUNT`]: a count that high can only
    /// mean handles are being leaked wholesale, and letting it wrap would eventually
    /// free the payload while live handles still point at it. The check runs before
    /// the store, so the count is never observed past the threshold.
    fn clone(&self) -> Self {
        let count = self.inner().count.get();
        if count >= MAX_COUNT {
            count_overflow_abort();
        }
        self.inner().count.set(count + 1);
        Self { ptr: self.ptr, alloc: self.alloc.clone(), _phantom: PhantomData }
    }
}

impl<T, A: BlockAlloc> Drop for Counted<T, A> {
    fn drop(&mut self) {
        let count = self.inner().count.get() - 1;
        self.inner().count.set(count);
        if count == 0 {
            unsafe {
                ptr::drop_in_place(ptr::addr_of_mut!((*self.ptr.as_ptr()).value));
                self.alloc.deallocate(self.ptr.cast(), Layout::new::<CountedInner<T>>());
            }
        }
    }
}

#[cold]
#[inline(never)]
fn count_overflow_abort() -> ! {
    // Unrecoverable: see the type docs. Panicking would run destructors that mutate
    // the very count that can no longer be trusted, so stop the process outright.
    let _ = writeln!(std::io::stderr(), "leaksafe: `Counted` reference count overflow, aborting");
    process::abort();
}

impl<T, A: BlockAlloc> AsRef<T> for Counted<T, A> {
    fn as_ref(&self) -> &T {
        &self.inner().value
    }
}

impl<T, A: BlockAlloc> Borrow<T> for Counted<T, A> {
    fn borrow(&self) -> &T {
        &self.inner().value
    }
}

impl<T, A: BlockAlloc> Deref for Counted<T, A> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner().value
    }
}

impl<T: PartialEq, A: BlockAlloc> PartialEq for Counted<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref().eq(other.as_ref())
    }
}

impl<T: Eq, A: BlockAlloc> Eq for Counted<T, A> {}

impl<T: PartialOrd, A: BlockAlloc> PartialOrd for Counted<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_ref().partial_cmp(other.as_ref())
    }
}

impl<T: Ord, A: BlockAlloc> Ord for Counted<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_ref().cmp(other.as_ref())
    }
}

impl<T: Hash, A: BlockAlloc> Hash for Counted<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ref().hash(state);
    }
}

impl<T: fmt::Debug, A: BlockAlloc> fmt::Debug for Counted<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_ref(), f)
    }
}

impl<T: fmt::Display, A: BlockAlloc> fmt::Display for Counted<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_ref(), f)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

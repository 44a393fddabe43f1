use core::{
    fmt,
    ops::{Bound, Deref, DerefMut, RangeBounds},
    ptr::{self, NonNull},
    slice,
};

use crate::{
    alloc::{BlockAlloc, Heap},
    collections::{
        imp::RawBuf,
        DoubleOrMinReserveStrategy, RangeError, ReserveStrategy, TryReserveError,
    },
};

mod drain;
pub use drain::Drain;

#[cfg(test)]
mod tests;

/// A growable contiguous sequence, the host of the draining cursor.
///
/// `Seq` owns a contiguous allocation of `capacity()` slots of which the first `len()`
/// hold initialized elements. It exposes the raw operations the cursor builds on
/// ([`set_len`], [`as_ptr`], [`as_mut_ptr`]) next to the usual safe surface.
///
/// The allocator and growth policy are pluggable; `Seq<T>` uses the process heap and
/// amortized doubling.
///
/// # Draining and leaking
///
/// [`drain`] hands out exclusive access to a sub-range through a [`Drain`] cursor.
/// The sequence is inaccessible for the cursor's whole lifetime (the cursor holds the
/// `&mut` borrow), and it is put into its skip-safe state *before* the cursor exists:
/// the visible length is truncated to the range's start. Dropping the cursor restores
/// the sequence; forgetting the cursor leaves it truncated, which leaks the detached
/// elements but never exposes them.
///
/// [`set_len`]: Seq::set_len
/// [`as_ptr`]: Seq::as_ptr
/// [`as_mut_ptr`]: Seq::as_mut_ptr
/// [`drain`]: Seq::drain
pub struct Seq<T, A: BlockAlloc = Heap, R: ReserveStrategy = DoubleOrMinReserveStrategy> {
    buf: RawBuf<T, A, R>,
    len: usize,
}

impl<T> Seq<T> {
    /// Constructs a new, empty `Seq<T>`.
    ///
    /// The sequence will not allocate until elements are pushed onto it.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(Heap)
    }

    /// Constructs a new, empty `Seq<T>` with at least the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds `isize::MAX` _bytes_.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Heap)
    }
}

impl<T, A: BlockAlloc, R: ReserveStrategy> Seq<T, A, R> {
    /// Constructs a new, empty `Seq<T, A, R>` with the given allocator.
    ///
    /// The sequence will not allocate until elements are pushed onto it.
    #[inline]
    #[must_use]
    pub const fn new_in(alloc: A) -> Self {
        Self { buf: RawBuf::new_in(alloc), len: 0 }
    }

    /// Constructs a new, empty `Seq<T, A, R>` with at least the specified capacity,
    /// allocated from the given allocator.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds `isize::MAX` _bytes_.
    ///
    /// # Aborts
    ///
    /// Aborts on OOM.
    #[must_use]
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self { buf: RawBuf::with_capacity_in(capacity, alloc), len: 0 }
    }

    /// Tries to construct a new, empty `Seq<T, A, R>` with at least the specified
    /// capacity, allocated from the given allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity exceeds `isize::MAX` _bytes_, or if the
    /// allocator reports an allocation failure.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        Ok(Self { buf: RawBuf::try_with_capacity_in(capacity, alloc)?, len: 0 })
    }

    /// Returns the total number of elements the sequence can hold without reallocating.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns the number of elements in the sequence.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the sequence contains no elements.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds `isize::MAX` _bytes_.
    ///
    /// # Aborts
    ///
    /// Aborts on OOM.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(self.len, additional);
    }

    /// The same as [`reserve`], but returns on errors instead of panicking or aborting.
    ///
    /// [`reserve`]: Seq::reserve
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.buf.try_reserve(self.len, additional)
    }

    /// Appends an element to the back of the sequence.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds `isize::MAX` _bytes_.
    #[inline]
    pub fn push(&mut self, value: T) {
        if self.len == self.buf.capacity() {
            self.buf.grow_one(self.len);
        }
        unsafe {
            ptr::write(self.as_mut_ptr().add(self.len), value);
            self.len += 1;
        }
    }

    /// Removes the last element from the sequence and returns it, or `None` if it is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            unsafe {
                self.len -= 1;
                Some(ptr::read(self.as_ptr().add(self.len)))
            }
        }
    }

    /// Removes and returns the element at position `index`, shifting all elements
    /// after it to the left.
    ///
    /// This is *O*(`len - index`); to remove a whole range in one pass, use [`drain`].
    ///
    /// [`drain`]: Seq::drain
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        #[cold]
        #[track_caller]
        fn assert_failed(index: usize, len: usize) -> ! {
            panic!("removal index (is {index}) should be < len (is {len})");
        }

        let len = self.len;
        if index >= len {
            assert_failed(index, len);
        }
        unsafe {
            let ptr = self.as_mut_ptr().add(index);
            let value = ptr::read(ptr);
            // shift everything past the hole down by one
            ptr::copy(ptr.add(1), ptr, len - index - 1);
            self.len = len - 1;
            value
        }
    }

    /// Shortens the sequence, keeping the first `len` elements and dropping the rest.
    ///
    /// No truncation occurs when `len` is greater than the sequence's current length.
    pub fn truncate(&mut self, len: usize) {
        // Safety:
        // - The slice passed to `drop_in_place` is valid; the `len > self.len` case avoids creating an invalid slice, and
        // - The `len` of the sequence is shrunk before calling `drop_in_place` such that no value will be dropped twice
        //   in case `drop_in_place` were to panic once (if it panics twice, the program aborts).
        unsafe {
            if len >= self.len {
                return;
            }
            let remaining_len = self.len - len;
            let s = ptr::slice_from_raw_parts_mut(self.as_mut_ptr().add(len), remaining_len);
            self.len = len;
            ptr::drop_in_place(s);
        }
    }

    /// Clears the sequence, removing all values.
    ///
    /// Note that this method has no effect on the allocated capacity of the sequence.
    #[inline]
    pub fn clear(&mut self) {
        let elems: *mut [T] = self.as_mut_slice();

        // SAFETY
        // - `elems` comes directly from `as_mut_slice` and is therefore valid.
        // - Setting `self.len` before calling `drop_in_place` means that if an element's `Drop` impl panics,
        //   the sequence's `Drop` impl will do nothing (leaking the rest of the elements) instead of dropping some twice.
        unsafe {
            self.len = 0;
            ptr::drop_in_place(elems);
        }
    }

    /// Extracts a slice containing the entire sequence.
    ///
    /// Equivalent to `&s[..]`.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self
    }

    /// Extracts a mutable slice of the entire sequence.
    ///
    /// Equivalent to `&mut s[..]`.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }

    /// Returns a raw pointer to the sequence's buffer, or a dangling raw pointer valid
    /// for zero sized reads if the sequence didn't allocate.
    ///
    /// The caller must ensure that the sequence outlives the pointer this function
    /// returns, or else it will end up pointing to garbage. Modifying the sequence may
    /// cause its buffer to be reallocated, which would also make any pointer to it
    /// invalid.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        // We shadow the slice method of the same name to avoid going through `deref`, which creates an intermediate reference.
        self.buf.ptr()
    }

    /// Returns an unsafe mutable pointer to the sequence's buffer, or a dangling raw
    /// pointer valid for zero sized reads if the sequence didn't allocate.
    ///
    /// The caller must ensure that the sequence outlives the pointer this function
    /// returns, or else it will end up pointing to garbage. Modifying the sequence may
    /// cause its buffer to be reallocated, which would also make any pointer to it
    /// invalid.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.ptr()
    }

    /// Forces the length of the sequence to `new_len`.
    ///
    /// This is the raw length adjustment: no element is constructed or destroyed, the
    /// sequence merely changes how many leading slots it considers initialized. It is
    /// the primitive the draining cursor uses to detach a range up front.
    ///
    /// # Safety
    ///
    /// - `new_len` must be less than or equal to [`capacity()`].
    /// - The elements at `old_len..new_len` must be initialized.
    ///
    /// [`capacity()`]: Seq::capacity
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());

        self.len = new_len;
    }

    /// Removes the specified range from the sequence in bulk, returning all removed
    /// elements as a cursor that yields them by value. If the cursor is dropped before
    /// being fully consumed, it drops the remaining removed elements.
    ///
    /// The returned cursor keeps a mutable borrow of the sequence: nothing else can
    /// touch the sequence until the cursor is gone.
    ///
    /// # Panics
    ///
    /// Panics if the starting point is greater than the end point or if the end point
    /// is greater than the length of the sequence. Use [`try_drain`] to get the range
    /// problem reported as a value instead.
    ///
    /// # Leaking
    ///
    /// If the returned cursor goes out of scope without being dropped (due to
    /// [`mem::forget`], for example), the sequence stays truncated at the range's
    /// start: every element from the range's start to the pre-drain length is leaked.
    /// The leak costs more elements than the drain covered, but no access through the
    /// sequence can ever reach freed or uninitialized memory.
    ///
    /// # Examples
    ///
    /// ```
    /// # use leaksafe::seq;
    /// let mut s = seq![1, 2, 3];
    /// let removed: Vec<_> = s.drain(1..).collect();
    /// assert_eq!(s, [1]);
    /// assert_eq!(removed, [2, 3]);
    ///
    /// // A full range clears the sequence, like `clear()` does
    /// s.drain(..);
    /// assert!(s.is_empty());
    /// ```
    ///
    /// [`try_drain`]: Seq::try_drain
    #[track_caller]
    pub fn drain<RA>(&mut self, range: RA) -> Drain<'_, T, A, R>
    where
        RA: RangeBounds<usize>,
    {
        match self.try_drain(range) {
            Ok(drain) => drain,
            Err(err) => drain_range_failed(err),
        }
    }

    /// The same as [`drain`], but reports an invalid range as a [`RangeError`] instead
    /// of panicking. The error is returned before the sequence is mutated in any way.
    ///
    /// [`drain`]: Seq::drain
    pub fn try_drain<RA>(&mut self, range: RA) -> Result<Drain<'_, T, A, R>, RangeError>
    where
        RA: RangeBounds<usize>,
    {
        // Memory safety
        //
        // When the cursor is first created, it shortens the length of the source
        // sequence to the start of the range, to make sure no uninitialized or
        // moved-from elements are accessible at all if the cursor's destructor never
        // gets to run.
        //
        // The cursor will ptr::read out the values to remove. When finished, the
        // remaining tail of the sequence is copied back to cover the hole, and the
        // length is restored.
        let len = self.len;
        let (start, end) = resolve_range(range, len)?;

        unsafe {
            // set the sequence's length to start, to be safe in case the cursor is leaked
            self.set_len(start);
            let range_slice = slice::from_raw_parts(self.as_ptr().add(start), end - start);
            Ok(Drain {
                tail_start: end,
                tail_len: len - end,
                iter: range_slice.iter(),
                seq: NonNull::from(self),
            })
        }
    }
}

/// Resolves `range` against a sequence of length `len` into `(start, end)`, rejecting
/// it before anything is mutated. Bounds that overflow `usize` are rejected too; they
/// can otherwise slip through for a zero-sized-element sequence of length `usize::MAX`.
fn resolve_range<RA>(range: RA, len: usize) -> Result<(usize, usize), RangeError>
where
    RA: RangeBounds<usize>,
{
    let end = match range.end_bound() {
        Bound::Included(&end) => match end.checked_add(1) {
            Some(end) => end,
            None => return Err(RangeError::EndOutOfBounds { end, len }),
        },
        Bound::Excluded(&end) => end,
        Bound::Unbounded => len,
    };
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => match start.checked_add(1) {
            Some(start) => start,
            None => return Err(RangeError::StartAfterEnd { start, end }),
        },
        Bound::Unbounded => 0,
    };

    if start > end {
        return Err(RangeError::StartAfterEnd { start, end });
    }
    if end > len {
        return Err(RangeError::EndOutOfBounds { end, len });
    }
    Ok((start, end))
}

#[cold]
#[track_caller]
fn drain_range_failed(err: RangeError) -> ! {
    panic!("{err}");
}

unsafe impl<T: Send, A: Send + BlockAlloc, R: ReserveStrategy> Send for Seq<T, A, R> {}
unsafe impl<T: Sync, A: Sync + BlockAlloc, R: ReserveStrategy> Sync for Seq<T, A, R> {}

impl<T, A: BlockAlloc, R: ReserveStrategy> Deref for Seq<T, A, R> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }
}

impl<T, A: BlockAlloc, R: ReserveStrategy> DerefMut for Seq<T, A, R> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
    }
}

impl<T> Default for Seq<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, A: BlockAlloc, R: ReserveStrategy> fmt::Debug for Seq<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: Clone, A: BlockAlloc + Clone, R: ReserveStrategy> Clone for Seq<T, A, R> {
    fn clone(&self) -> Self {
        let mut cloned = Self::with_capacity_in(self.len, self.buf.alloc().clone());
        for value in self.iter() {
            cloned.push(value.clone());
        }
        cloned
    }
}

impl<T, A: BlockAlloc, R: ReserveStrategy> Extend<T> for Seq<T, A, R> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.push(value);
        }
    }
}

impl<T> FromIterator<T> for Seq<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut seq = Seq::new();
        seq.extend(iter);
        seq
    }
}

impl<'a, T, A: BlockAlloc, R: ReserveStrategy> IntoIterator for &'a Seq<T, A, R> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: BlockAlloc, R: ReserveStrategy> IntoIterator for &'a mut Seq<T, A, R> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

macro_rules! impl_slice_partial_eq {
    ([$($vars:tt)*] $lhs:ty, $rhs:ty) => {
        impl<T, U, $($vars)*> PartialEq<$rhs> for $lhs where
            T: PartialEq<U>,
        {
            #[inline]
            fn eq(&self, other: &$rhs) -> bool { self[..] == other[..] }
        }
    };
}

impl_slice_partial_eq!{ [A: BlockAlloc, R: ReserveStrategy, A2: BlockAlloc, R2: ReserveStrategy] Seq<T, A, R>, Seq<U, A2, R2> }
impl_slice_partial_eq!{ [A: BlockAlloc, R: ReserveStrategy] Seq<T, A, R>, [U] }
impl_slice_partial_eq!{ [A: BlockAlloc, R: ReserveStrategy] Seq<T, A, R>, &[U] }
impl_slice_partial_eq!{ [A: BlockAlloc, R: ReserveStrategy, const N: usize] Seq<T, A, R>, [U; N] }

impl<T: Eq, A: BlockAlloc, R: ReserveStrategy> Eq for Seq<T, A, R> {}

impl<T, A: BlockAlloc, R: ReserveStrategy> Drop for Seq<T, A, R> {
    fn drop(&mut self) {
        unsafe {
            // `RawBuf` frees the allocation afterwards, this only drops the elements.
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), self.len))
        }
    }
}

/// Creates a [`Seq`] containing the arguments, like `vec!` does for `Vec`.
#[macro_export]
macro_rules! seq {
    () => {
        $crate::collections::Seq::new()
    };
    ($elem:expr; $n:expr) => {{
        let n = $n;
        let elem = $elem;
        let mut seq = $crate::collections::Seq::with_capacity(n);
        for _ in 0..n {
            seq.push(::core::clone::Clone::clone(&elem));
        }
        seq
    }};
    ($($x:expr),+ $(,)?) => {{
        let mut seq = $crate::collections::Seq::new();
        $(seq.push($x);)+
        seq
    }};
}

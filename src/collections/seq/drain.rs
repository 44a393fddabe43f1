use core::{
    fmt,
    iter::FusedIterator,
    mem::{self, ManuallyDrop},
    ptr::{self, NonNull},
    slice,
};

use crate::{
    alloc::{BlockAlloc, Heap},
    collections::{DoubleOrMinReserveStrategy, ReserveStrategy},
};

use super::Seq;

/// A draining extraction cursor for `Seq<T, ...>`.
///
/// This `struct` is created by [`Seq::drain`] and [`Seq::try_drain`]. It removes the
/// chosen range by value, one element per [`next`] call, while holding the sequence's
/// exclusive borrow for its entire lifetime.
///
/// The source sequence is truncated to the range's start the moment the cursor is
/// created, so the cursor's destructor is pure restoration: it drops whatever was not
/// yielded, shifts the untouched tail down over the gap, and fixes the length up. If
/// the destructor is skipped, the sequence just stays truncated — shorter than it was,
/// never stale.
///
/// [`next`]: Iterator::next
pub struct Drain<'a, T: 'a, A: BlockAlloc = Heap, R: ReserveStrategy = DoubleOrMinReserveStrategy> {
    /// Index of tail to preserve.
    pub(super) tail_start: usize,
    /// Length of the tail.
    pub(super) tail_len: usize,
    /// Current remaining range to remove.
    pub(super) iter: slice::Iter<'a, T>,
    pub(super) seq: NonNull<Seq<T, A, R>>,
}

impl<T: fmt::Debug, A: BlockAlloc, R: ReserveStrategy> fmt::Debug for Drain<'_, T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Drain").field(&self.iter.as_slice()).finish()
    }
}

impl<T, A: BlockAlloc, R: ReserveStrategy> Drain<'_, T, A, R> {
    /// Returns the remaining items of this cursor as a slice.
    ///
    /// # Examples
    ///
    /// ```
    /// # use leaksafe::seq;
    /// let mut s = seq!['a', 'b', 'c'];
    /// let mut drain = s.drain(..);
    /// assert_eq!(drain.as_slice(), &['a', 'b', 'c']);
    /// let _ = drain.next().unwrap();
    /// assert_eq!(drain.as_slice(), &['b', 'c']);
    /// ```
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.iter.as_slice()
    }

    /// Keep unyielded elements in the source `Seq`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use leaksafe::seq;
    /// let mut s = seq!['a', 'b', 'c'];
    /// let mut drain = s.drain(..);
    ///
    /// assert_eq!(drain.next().unwrap(), 'a');
    ///
    /// // This call keeps 'b' and 'c' in the sequence.
    /// drain.keep_rest();
    ///
    /// // If we wouldn't call `keep_rest()`, `s` would be empty.
    /// assert_eq!(s, ['b', 'c']);
    /// ```
    pub fn keep_rest(self) {
        // At this moment layout looks like this:
        //
        // [head] [yielded by next] [unyielded] [yielded by next_back] [tail]
        //        ^-- start         \_________/-- unyielded_len        \____/-- self.tail_len
        //                           ^-- unyielded_ptr                  ^-- tail
        //
        // Normally the `Drop` impl would drop [unyielded] and then move [tail] to `start`.
        // Here we want to
        // 1. Move [unyielded] to `start`
        // 2. Move [tail] to a new start at `start + len(unyielded)`
        // 3. Update length of the original sequence to `len(head) + len(unyielded) + len(tail)`
        //    a. In case of ZST, this is the only thing we want to do
        // 4. Do *not* drop self, as everything is put in a consistent state already, there is nothing to do
        let mut this = ManuallyDrop::new(self);

        unsafe {
            let source_seq = this.seq.as_mut();

            let start = source_seq.len();
            let tail = this.tail_start;

            let unyielded_len = this.iter.len();
            let unyielded_ptr = this.iter.as_slice().as_ptr();

            // ZST have no identity
            if mem::size_of::<T>() != 0 {
                let start_ptr = source_seq.as_mut_ptr().add(start);

                // memmove back unyielded elements
                if unyielded_ptr != start_ptr {
                    ptr::copy(unyielded_ptr, start_ptr, unyielded_len);
                }

                // memmove back untouched tail
                if tail != (start + unyielded_len) {
                    let src = source_seq.as_ptr().add(tail);
                    let dst = start_ptr.add(unyielded_len);
                    ptr::copy(src, dst, this.tail_len);
                }
            }

            source_seq.set_len(start + unyielded_len + this.tail_len);
        }
    }
}

impl<'a, T, A: BlockAlloc, R: ReserveStrategy> AsRef<[T]> for Drain<'a, T, A, R> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

unsafe impl<'a, T: Sync, A: Sync + BlockAlloc, R: ReserveStrategy> Sync for Drain<'a, T, A, R> {}
unsafe impl<'a, T: Send, A: Send + BlockAlloc, R: ReserveStrategy> Send for Drain<'a, T, A, R> {}

impl<T, A: BlockAlloc, R: ReserveStrategy> Iterator for Drain<'_, T, A, R> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        // A raw move: nothing considers the slot initialized anymore, the value is
        // owned solely by the caller.
        self.iter.next().map(|elt| unsafe { ptr::read(elt as *const _) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<T, A: BlockAlloc, R: ReserveStrategy> DoubleEndedIterator for Drain<'_, T, A, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|elt| unsafe { ptr::read(elt as *const _) })
    }
}

impl<T, A: BlockAlloc, R: ReserveStrategy> Drop for Drain<'_, T, A, R> {
    fn drop(&mut self) {
        let iter = mem::take(&mut self.iter);
        let drop_len = iter.len();

        let mut seq = self.seq;

        if mem::size_of::<T>() == 0 {
            // ZST have no identity, so we don't need to move them around, we only need to drop the correct amount.
            // This can be achieved by manipulating the sequence's length instead of moving values out of `iter`.
            unsafe {
                let seq = seq.as_mut();
                let old_len = seq.len();
                seq.set_len(old_len + drop_len + self.tail_len);
                seq.truncate(old_len + self.tail_len);
            }

            return;
        }

        let tail_start = self.tail_start;
        let tail_len = self.tail_len;

        // Moves the un-`Drain`ed tail back even when `drop_in_place` panics below.
        defer! {
            if tail_len > 0 {
                unsafe {
                    let seq = seq.as_mut();
                    // memmove back untouched tail, update to new length
                    let start = seq.len();
                    if tail_start != start {
                        let src = seq.as_ptr().add(tail_start);
                        let dst = seq.as_mut_ptr().add(start);
                        ptr::copy(src, dst, tail_len);
                    }
                    seq.set_len(start + tail_len);
                }
            }
        }

        if drop_len == 0 {
            return;
        }

        let drop_ptr = iter.as_slice().as_ptr();

        unsafe {
            // drop_ptr comes from a slice::Iter which only gives us a &[T], but for
            // drop_in_place a pointer with mutable provenance is necessary. Therefore
            // we reconstruct it from the sequence's own mutable pointer.
            let seq_ptr = self.seq.as_mut().as_mut_ptr();
            let drop_offset = drop_ptr.offset_from(seq_ptr) as usize;
            let to_drop = ptr::slice_from_raw_parts_mut(seq_ptr.add(drop_offset), drop_len);
            ptr::drop_in_place(to_drop);
        }
    }
}

impl<T, A: BlockAlloc, R: ReserveStrategy> ExactSizeIterator for Drain<'_, T, A, R> {}

impl<T, A: BlockAlloc, R: ReserveStrategy> FusedIterator for Drain<'_, T, A, R> {}

use core::cell::Cell;
use core::mem;
use core::ops::Bound;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::collections::RangeError;
use crate::seq;

use super::*;

#[test]
fn seq_new() {
    let s = Seq::<i32>::new();
    assert_eq!(s.capacity(), 0);
    assert_eq!(s.len(), 0);

    let s = Seq::<i32>::with_capacity(21);
    assert!(s.capacity() >= 21);
    assert_eq!(s.len(), 0);
}

#[test]
fn seq_reserve() {
    let mut s = Seq::<i32>::new();
    s.reserve(21);
    assert!(s.capacity() >= 21);

    let mut s = Seq::<i32>::new();
    assert!(matches!(s.try_reserve(21), Ok(())));
    assert!(s.capacity() >= 21);
}

#[test]
fn seq_push_and_access() {
    let mut s = Seq::<i32>::new();

    s.push(42);
    assert!(s.capacity() >= 1);
    assert_eq!(s.len(), 1);
    assert_eq!(s[0], 42);

    s.push(84);
    assert!(s.capacity() >= 2);
    assert_eq!(s.len(), 2);
    assert_eq!(s[1], 84);
}

#[test]
fn seq_pop() {
    let mut s = seq![1, 2, 3];
    assert_eq!(s.pop(), Some(3));
    assert_eq!(s.pop(), Some(2));
    assert_eq!(s.pop(), Some(1));
    assert_eq!(s.pop(), None);
}

#[test]
fn seq_remove() {
    let mut s = seq![1, 2, 3, 4];
    assert_eq!(s.remove(1), 2);
    assert_eq!(s, [1, 3, 4]);
    assert_eq!(s.remove(0), 1);
    assert_eq!(s, [3, 4]);
}

#[test]
#[should_panic]
fn seq_remove_out_of_bounds() {
    let mut s = seq![1, 2, 3];
    s.remove(3);
}

#[test]
fn seq_truncate_and_clear() {
    let mut s = seq![1, 2, 3, 4, 5];
    s.truncate(2);
    assert_eq!(s, [1, 2]);

    s.truncate(8);
    assert_eq!(s, [1, 2]);

    s.clear();
    assert!(s.is_empty());
}

#[test]
fn seq_from_iter_eq() {
    let s: Seq<i32> = (0..5).collect();
    assert_eq!(s, [0, 1, 2, 3, 4]);

    let s2 = seq![0, 1, 2, 3, 4];
    assert_eq!(s, s2);
    assert_eq!(s.as_slice(), &[0, 1, 2, 3, 4][..]);
}

#[test]
fn seq_repeat_macro() {
    let s = seq![7u8; 4];
    assert_eq!(s, [7, 7, 7, 7]);
}

//--------------------------------------------------------------
// drain: completion

#[test]
fn drain_middle_restores_length_and_order() {
    let mut s = seq![1, 2, 3, 4, 5, 6];
    let removed: Vec<_> = s.drain(1..4).collect();

    assert_eq!(removed, [2, 3, 4]);
    assert_eq!(s.len(), 3);
    assert_eq!(s, [1, 5, 6]);
}

#[test]
fn drain_full_range_clears() {
    let mut s = seq![1, 2, 3];
    s.drain(..);
    assert_eq!(s.len(), 0);
    assert!(s.is_empty());
}

#[test]
fn drain_tail_range_is_just_a_length_set() {
    // end == original_len: completion has no tail to shift
    let mut s = seq![1, 2, 3, 4];
    let removed: Vec<_> = s.drain(2..).collect();
    assert_eq!(removed, [3, 4]);
    assert_eq!(s, [1, 2]);
}

#[test]
fn drain_empty_range_is_a_noop() {
    let mut s = seq![1, 2, 3];
    {
        let mut drain = s.drain(1..1);
        assert_eq!(drain.next(), None);
    }
    assert_eq!(s, [1, 2, 3]);
}

#[test]
fn drain_unconsumed_elements_are_dropped() {
    let drops = Cell::new(0);
    let mut s: Seq<DropCounter> = (0..5).map(|_| DropCounter { count: &drops }).collect();

    {
        let mut drain = s.drain(1..4);
        // yield one of the three, leave two unyielded
        drop(drain.next());
    }

    // all three drained elements are gone, the rest survive
    assert_eq!(drops.get(), 3);
    assert_eq!(s.len(), 2);

    drop(s);
    assert_eq!(drops.get(), 5);
}

#[test]
fn drain_back_to_front() {
    let mut s = seq![1, 2, 3, 4];
    {
        let mut drain = s.drain(1..);
        assert_eq!(drain.next_back(), Some(4));
        assert_eq!(drain.next(), Some(2));
        assert_eq!(drain.as_slice(), &[3]);
    }
    assert_eq!(s, [1]);
}

#[test]
fn drain_keep_rest() {
    let mut s = seq![1, 2, 3, 4, 5];
    let mut drain = s.drain(1..4);
    assert_eq!(drain.next(), Some(2));

    drain.keep_rest();
    assert_eq!(s, [1, 3, 4, 5]);
}

#[test]
fn drain_panicking_element_drop_still_restores_tail() {
    struct PanicOnDrop {
        id: i32,
        panics: bool,
    }

    impl Drop for PanicOnDrop {
        fn drop(&mut self) {
            if self.panics {
                panic!("payload drop failure");
            }
        }
    }

    let mut s: Seq<PanicOnDrop> = (0..6)
        .map(|id| PanicOnDrop { id, panics: id == 2 })
        .collect();

    // yield one of the three drained elements, then let the cursor's destructor hit
    // the panicking element while dropping the unyielded rest
    let unwound = catch_unwind(AssertUnwindSafe(|| {
        let mut drain = s.drain(1..4);
        drop(drain.next());
    }));
    assert!(unwound.is_err());

    // the untouched tail was still shifted back and the length restored
    let ids: Vec<_> = s.iter().map(|p| p.id).collect();
    assert_eq!(ids, [0, 4, 5]);
    assert_eq!(s.len(), 3);
}

#[test]
fn drain_zst() {
    let mut s: Seq<()> = (0..8).map(|_| ()).collect();
    {
        let mut drain = s.drain(2..6);
        assert_eq!(drain.next(), Some(()));
    }
    assert_eq!(s.len(), 4);
}

//--------------------------------------------------------------
// drain: invalid ranges

#[test]
fn try_drain_reports_before_mutating() {
    let mut s = seq![1, 2, 3];

    assert_eq!(
        s.try_drain(2..8).err(),
        Some(RangeError::EndOutOfBounds { end: 8, len: 3 })
    );
    // the sequence was left untouched
    assert_eq!(s, [1, 2, 3]);

    #[allow(clippy::reversed_empty_ranges)]
    let err = s.try_drain(2..1).err();
    assert_eq!(err, Some(RangeError::StartAfterEnd { start: 2, end: 1 }));
    assert_eq!(s, [1, 2, 3]);
}

#[test]
fn try_drain_rejects_overflowing_bounds() {
    // a zero-sized-element sequence can actually reach length usize::MAX, where an
    // overflowing bound resolves to a value that passes the in-bounds checks
    let mut s = Seq::<()>::new();
    unsafe { s.set_len(usize::MAX) };

    assert_eq!(
        s.try_drain(..=usize::MAX).err(),
        Some(RangeError::EndOutOfBounds { end: usize::MAX, len: usize::MAX })
    );
    assert_eq!(s.len(), usize::MAX);

    let err = s.try_drain((Bound::Excluded(usize::MAX), Bound::Unbounded)).err();
    assert_eq!(
        err,
        Some(RangeError::StartAfterEnd { start: usize::MAX, end: usize::MAX })
    );
    assert_eq!(s.len(), usize::MAX);
}

#[test]
#[should_panic]
fn drain_panics_on_bad_range() {
    let mut s = seq![1, 2, 3];
    s.drain(1..5);
}

//--------------------------------------------------------------
// drain: skipped cleanup

#[test]
fn drain_forget_leaves_truncation_not_garbage() {
    // the boxed-integer scenario: drain [0, 4), take two, forget the cursor
    let mut s: Seq<Box<i32>> = (1..=4).map(Box::new).collect();

    let mut drain = s.drain(0..4);
    assert_eq!(*drain.next().unwrap(), 1);
    assert_eq!(*drain.next().unwrap(), 2);
    mem::forget(drain);

    // boxes 3 and 4 are unreachable now, but every read below is of live memory
    assert_eq!(s.len(), 0);
    assert_eq!(s.as_slice(), &[] as &[Box<i32>]);

    // the sequence stays usable; new elements land in the reusable storage
    s.push(Box::new(10));
    assert_eq!(*s[0], 10);
}

#[test]
fn drain_forget_keeps_head_intact() {
    let mut s = seq![10, 20, 30, 40, 50];

    let mut drain = s.drain(2..4);
    assert_eq!(drain.next(), Some(30));
    mem::forget(drain);

    // visible length is the range start; the head is untouched
    assert_eq!(s.len(), 2);
    assert_eq!(s, [10, 20]);
}

#[test]
fn drain_forget_leaks_exactly_the_detached_range() {
    let drops = Cell::new(0);
    let mut s: Seq<DropCounter> = (0..4).map(|_| DropCounter { count: &drops }).collect();

    let drain = s.drain(1..3);
    mem::forget(drain);

    // everything from the range start to the old length is detached: not dropped,
    // not reachable, and not double-freed when the sequence goes away
    assert_eq!(drops.get(), 0);
    assert_eq!(s.len(), 1);

    drop(s);
    assert_eq!(drops.get(), 1);
}

#[test]
fn drain_forget_empty_range_leaks_only_the_tail() {
    let drops = Cell::new(0);
    let mut s: Seq<DropCounter> = (0..4).map(|_| DropCounter { count: &drops }).collect();

    let drain = s.drain(2..2);
    mem::forget(drain);

    assert_eq!(s.len(), 2);
    drop(s);
    assert_eq!(drops.get(), 2);
}

struct DropCounter<'a> {
    count: &'a Cell<u32>,
}

impl Drop for DropCounter<'_> {
    fn drop(&mut self) {
        self.count.set(self.count.get() + 1);
    }
}

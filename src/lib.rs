//! Proxy ownership primitives that stay memory-safe when their cleanup is skipped.
//!
//! A *proxy* is a value that grants temporary, structured access to a resource it does
//! not fully own: a draining cursor over a sequence, a counted handle to a shared
//! allocation. The usual way to reason about such types is "my destructor restores the
//! invariants". That reasoning is not available here: safe code can always skip a
//! value's destructor (`mem::forget`, a reference cycle, `ManuallyDrop`), so every
//! proxy in this crate is designed with the skipped destructor as a reachable state
//! with a defined, safe outcome.
//!
//! The strategy is the same for both primitives: the *skip-safe* state is established
//! eagerly, before the proxy is handed out, and the destructor is only an optimization
//! that restores a nicer state when it does run.
//!
//! - [`Seq::drain`](collections::Seq::drain) truncates the sequence's visible length to
//!   the start of the drained range *before* returning the cursor. If the cursor's
//!   destructor never runs, the sequence merely looks shorter than it was; the detached
//!   elements are leaked, never exposed as freed or uninitialized memory. This is
//!   *leak amplification*: skipping cleanup mid-drain leaks more elements than the
//!   drain itself covered, in exchange for unconditional memory safety.
//! - [`Counted`](mem::Counted) keeps its payload alive until the reference count hits
//!   zero. A skipped handle destructor means a decrement that never happens: the block
//!   is leaked, never double-freed. The count itself is guarded — a clone that would
//!   push it past [`MAX_COUNT`](mem::MAX_COUNT) aborts the process rather than letting
//!   the count wrap and later reach zero while live handles still exist.
//!
//! Leak-freedom is explicitly not a goal; only memory safety is.
//!
//! # Why there is no scoped join handle here
//!
//! An earlier sibling of these types was a worker-thread handle that borrowed data from
//! its spawning scope and relied on its destructor joining the thread to bound the
//! borrow. Under a skipped destructor that design has no safe fallback: the borrowed
//! data can be freed while the worker still reads it, and no bookkeeping inside the
//! handle can prevent it. A proxy whose *only* safety argument is "my destructor is
//! guaranteed to run" cannot be made sound; the shared data has to be owned by the
//! worker or reference-counted instead. That type was withdrawn and is deliberately
//! absent from this crate.

#[macro_use]
extern crate scopeguard;

pub mod alloc;
pub mod collections;
pub mod mem;

pub use collections::{Drain, RangeError, Seq};
pub use mem::Counted;

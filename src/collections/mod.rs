mod imp;
mod seq;

pub use seq::*;

use thiserror::Error;

use crate::alloc::AllocError;

//--------------------------------------------------------------

/// Error returned when a container cannot reserve additional capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryReserveError {
    /// The computed capacity exceeded the container's maximum (`isize::MAX` bytes).
    #[error("capacity overflow: requested capacity exceeds isize::MAX bytes")]
    CapacityOverflow,
    /// The allocator refused the request.
    #[error("{0}")]
    Alloc(#[from] AllocError),
}

/// Error returned when a drain range does not describe a valid sub-range of the
/// sequence it is applied to. Reported before the sequence is mutated in any way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The range's start lies after its end.
    #[error("drain start ({start}) is after end ({end})")]
    StartAfterEnd { start: usize, end: usize },
    /// The range's end lies past the current length.
    #[error("drain end ({end}) is out of bounds of length {len}")]
    EndOutOfBounds { end: usize, len: usize },
}

//--------------------------------------------------------------

/// A trait used to define a strategy to reserve additional memory for containers.
pub trait ReserveStrategy {
    /// Calculate the new capacity for a container.
    ///
    /// `cur_capacity` represents the current capacity of the container.
    ///
    /// `min_capacity` represents the minimum required capacity to be able to resize.
    ///
    /// Returns `Err(())` if the capacity were to overflow
    fn calculate(cur_capacity: usize, min_capacity: usize) -> Result<usize, ()>;
}

/// A reserve strategy that will try to either return double the current capacity, or the minimum required capacity, whichever is bigger.
pub struct DoubleOrMinReserveStrategy;

impl ReserveStrategy for DoubleOrMinReserveStrategy {
    fn calculate(cur_capacity: usize, min_capacity: usize) -> Result<usize, ()> {
        let double_cap = cur_capacity * 2;
        let new_cap = if double_cap > min_capacity { double_cap } else { min_capacity };
        if new_cap <= isize::MAX as usize {
            Ok(new_cap)
        } else {
            Err(())
        }
    }
}

use std::fmt;
use thiserror::Error;

/// Construction parameters rejected by a queue constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("initial capacity must be 2 or more, got {0}")]
    InitialCapacityTooSmall(usize),

    #[error("max capacity must be 4 or more, got {0}")]
    MaxCapacityTooSmall(usize),

    /// Both values are compared after rounding up to a power of 2.
    #[error("initial capacity {initial} must round to a smaller power of 2 than max capacity {max}")]
    InitialNotBelowMax { initial: usize, max: usize },

    #[error("capacity {requested} exceeds the largest supported capacity {limit}")]
    TooLarge { requested: usize, limit: usize },
}

/// Returned by `offer` when a bounded queue has no room.
///
/// Not a fault - the caller decides whether to retry. Holds the rejected value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is full")
    }
}

impl<T> std::error::Error for Full<T> {}

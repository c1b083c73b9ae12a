//! Single-producer single-consumer.
//!
//! One fixed-capacity circular chunk, never grows. Capacity is rounded up to a power
//! of 2, minimum 4. No CAS: producer and consumer each own their index and publish it
//! with release stores.
//!
//! The producer does not check the slot it writes to on every `offer`. Instead it probes
//! a slot [look_ahead_step](Producer::look_ahead_step) cells ahead, and if that one is
//! free, writes up to it without further checks.
//!
//! [Producer] and [Consumer] are not `Clone` and mutate through `&mut self` - there is
//! exactly one of each.
//!
//! ```
//! use chunked_queues::spsc;
//!
//! let (mut producer, mut consumer) = spsc::queue::<u32>(4).unwrap();
//! for i in 0..4 {
//!     producer.offer(i).unwrap();
//! }
//! assert_eq!(producer.offer(4).unwrap_err().into_inner(), 4);
//! assert_eq!(consumer.poll(), Some(0));
//! ```

mod queue;

pub use queue::*;

use crate::error::CapacityError;

pub trait Settings{
    /// Upper bound for the producer look-ahead step.
    /// Actual step is `max(1, min(capacity / 4, MAX_LOOK_AHEAD_STEP))`.
    const MAX_LOOK_AHEAD_STEP: usize = 4096;
}

pub struct DefaultSettings{}
impl Settings for DefaultSettings{}

/// Queue with [DefaultSettings].
#[inline]
pub fn queue<T>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), CapacityError> {
    with_settings::<T, DefaultSettings>(capacity)
}

#[inline]
pub fn with_settings<T, S: Settings>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), CapacityError> {
    queue::split(capacity, S::MAX_LOOK_AHEAD_STEP)
}

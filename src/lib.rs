//! Lock-free bounded queues for passing values between threads.
//!
//! * [spsc] - single producer, single consumer. One fixed circular array.
//! * [mpsc] - many producers, single consumer. Grows by linked chunks up to a fixed bound,
//!   without ever copying elements.
//!
//! Both hand out a `(Producer, Consumer)` pair. Whatever the queue shape requires to be unique
//! is not `Clone`, and mutates through `&mut self`.
//!
//! Streaming `fill_with` / `drain_with` take a [WaitStrategy] and an [ExitCondition]; see [wait].

mod sync;
mod utils;
mod dynamic_array;
mod chunk;
mod error;

pub mod wait;
pub mod spsc;
pub mod mpsc;

pub use error::{CapacityError, Full};
pub use wait::{WaitStrategy, ExitCondition};

#[cfg(test)]
mod tests;

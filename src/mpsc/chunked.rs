use std::fmt;
use crate::error::{CapacityError, Full};
use crate::sync::Arc;
use crate::utils::round_to_power_of_two;
use crate::wait::{ExitCondition, WaitStrategy};
use super::base::{BaseQueue, ChunkPolicy};

/// Fixed chunk size, bounded total.
pub(crate) struct Chunked{
    /// Doubled, as indices.
    max_queue_capacity: u64,
}

impl ChunkPolicy for Chunked{
    #[inline]
    fn available_in_queue(&self, producer_index: u64, consumer_index: u64) -> i64 {
        self.max_queue_capacity as i64 - (producer_index - consumer_index) as i64
    }

    #[inline]
    fn next_chunk_len(&self, current_len: usize) -> usize {
        current_len
    }

    #[inline]
    fn current_chunk_capacity(&self, mask: u64) -> u64 {
        mask
    }

    #[inline]
    fn capacity(&self) -> usize {
        (self.max_queue_capacity / 2) as usize
    }
}

type Queue<T> = BaseQueue<T, Chunked>;

/// Bounded MPSC queue growing in chunks of `initial_capacity` (rounded up to a power of 2)
/// up to `max_capacity` (rounded up to a power of 2).
///
/// `initial_capacity` must be 2 or more, `max_capacity` 4 or more, and must round to a
/// larger power of 2 than `initial_capacity`.
pub fn chunked<T>(initial_capacity: usize, max_capacity: usize)
    -> Result<(Producer<T>, Consumer<T>), CapacityError>
{
    if initial_capacity < 2 {
        return Err(CapacityError::InitialCapacityTooSmall(initial_capacity));
    }
    if max_capacity < 4 {
        return Err(CapacityError::MaxCapacityTooSmall(max_capacity));
    }
    let chunk_len    = round_to_power_of_two(initial_capacity)?;
    let max_capacity_pow2 = round_to_power_of_two(max_capacity)?;
    if chunk_len >= max_capacity_pow2 {
        return Err(CapacityError::InitialNotBelowMax{ initial: initial_capacity, max: max_capacity });
    }

    tracing::debug!(chunk_len, max_capacity = max_capacity_pow2, "mpsc chunked queue created");

    let queue = Arc::new(Queue::new(chunk_len, Chunked{
        max_queue_capacity: (max_capacity_pow2 as u64) << 1
    }));
    Ok((
        Producer{ queue: queue.clone() },
        Consumer{ queue }
    ))
}

/// [chunked] with chunk size derived from `max_capacity`: an eighth of it, kept within `2..=1024`.
#[inline]
pub fn with_max_capacity<T>(max_capacity: usize)
    -> Result<(Producer<T>, Consumer<T>), CapacityError>
{
    let initial_capacity = round_to_power_of_two((max_capacity / 8).min(1024))?.max(2);
    chunked(initial_capacity, max_capacity)
}

/// Write side. Clone it for each producer thread.
pub struct Producer<T>{
    queue: Arc<Queue<T>>,
}

impl<T> Clone for Producer<T>{
    fn clone(&self) -> Self {
        Self{ queue: self.queue.clone() }
    }
}

impl<T> Producer<T>{
    /// `Err(Full(value))` if the queue holds `capacity()` elements.
    ///
    /// Enqueue order between producers is the order their index claims succeed.
    #[inline]
    pub fn offer(&self, value: T) -> Result<(), Full<T>>{
        self.queue.offer(value)
    }

    /// Same as [offer](Self::offer).
    #[inline]
    pub fn relaxed_offer(&self, value: T) -> Result<(), Full<T>>{
        self.queue.offer(value)
    }

    /// Claims up to `batch_size` slots at once, and calls `supply` for each.
    /// Claims fewer when the current chunk or the queue runs out of room.
    ///
    /// Returns number of elements written. 0 means full, or `batch_size` was 0.
    #[inline]
    pub fn fill<F>(&self, supply: F, batch_size: usize) -> usize
        where F: FnMut() -> T
    {
        self.queue.fill(supply, batch_size)
    }

    /// Fills until full. Under concurrent draining, stops once more than `capacity()`
    /// elements were written.
    #[inline]
    pub fn fill_all<F>(&self, supply: F) -> usize
        where F: FnMut() -> T
    {
        self.queue.fill_all(supply)
    }

    /// Fills while `exit` keeps running, calling `wait` while the queue stays full.
    #[inline]
    pub fn fill_with<F, W, E>(&self, supply: F, wait: W, exit: E)
        where F: FnMut() -> T, W: WaitStrategy, E: ExitCondition
    {
        self.queue.fill_with(supply, wait, exit)
    }
}

/// Read side. Exactly one per queue:
///
/// ```compile_fail
/// let (_producer, consumer) = chunked_queues::mpsc::chunked::<u32>(2, 8).unwrap();
/// let second = consumer.clone();
/// ```
pub struct Consumer<T>{
    queue: Arc<Queue<T>>,
}

impl<T> Consumer<T>{
    /// `None` only if the queue is empty.
    ///
    /// If a producer claimed the head index but has not written it yet, spins until it does.
    #[inline]
    pub fn poll(&mut self) -> Option<T>{
        unsafe{ self.queue.poll() }
    }

    /// As [poll](Self::poll), but `None` as soon as the head element is not visible.
    /// May return `None` while the queue is not empty.
    #[inline]
    pub fn relaxed_poll(&mut self) -> Option<T>{
        unsafe{ self.queue.relaxed_poll() }
    }

    /// Head element, without removing it. Spins like [poll](Self::poll).
    ///
    /// `&mut self` because reading past a chunk boundary moves the consumer into the next chunk.
    #[inline]
    pub fn peek(&mut self) -> Option<&T>{
        unsafe{ self.queue.peek() }
    }

    #[inline]
    pub fn relaxed_peek(&mut self) -> Option<&T>{
        unsafe{ self.queue.relaxed_peek() }
    }

    /// Passes up to `limit` elements to `consume`, using [relaxed_poll](Self::relaxed_poll).
    #[inline]
    pub fn drain<F>(&mut self, consume: F, limit: usize) -> usize
        where F: FnMut(T)
    {
        unsafe{ self.queue.drain(consume, limit) }
    }

    /// [drain](Self::drain) with `limit = capacity()`.
    #[inline]
    pub fn drain_all<F>(&mut self, consume: F) -> usize
        where F: FnMut(T)
    {
        let capacity = self.queue.capacity();
        unsafe{ self.queue.drain(consume, capacity) }
    }

    /// Drains while `exit` keeps running, calling `wait` while the queue stays empty.
    #[inline]
    pub fn drain_with<F, W, E>(&mut self, consume: F, wait: W, exit: E)
        where F: FnMut(T), W: WaitStrategy, E: ExitCondition
    {
        unsafe{ self.queue.drain_with(consume, wait, exit) }
    }
}

macro_rules! queue_indicators {
    ($handle:ident) => {
        impl<T> $handle<T>{
            /// Estimate under concurrent use. Never above the true count plus in-flight offers.
            #[inline]
            pub fn len(&self) -> usize{
                self.queue.len()
            }

            #[inline]
            pub fn is_empty(&self) -> bool{
                self.queue.is_empty()
            }

            /// Max elements in queue.
            #[inline]
            pub fn capacity(&self) -> usize{
                self.queue.capacity()
            }

            #[inline]
            pub fn current_producer_index(&self) -> u64{
                self.queue.current_producer_index()
            }

            #[inline]
            pub fn current_consumer_index(&self) -> u64{
                self.queue.current_consumer_index()
            }

            #[inline]
            pub(crate) fn producer_chunk_len(&self) -> usize{
                self.queue.producer_chunk_len()
            }
        }

        impl<T> fmt::Debug for $handle<T>{
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($handle))
                    .field("len", &self.len())
                    .field("capacity", &self.capacity())
                    .field("chunk_len", &self.producer_chunk_len())
                    .finish_non_exhaustive()
            }
        }
    };
}

queue_indicators!(Producer);
queue_indicators!(Consumer);

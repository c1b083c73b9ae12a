use std::fmt;
use crossbeam_utils::CachePadded;
use crate::chunk::{Chunk, Slot};
use crate::error::{CapacityError, Full};
use crate::sync::{Arc, AtomicU64, Ordering};
use crate::utils;
use crate::wait::{ExitCondition, WaitStrategy};

/// Shared state. Indices are plain element counts.
pub(crate) struct SpscQueue<T>{
    /// Written by producer only.
    producer_index: CachePadded<AtomicU64>,
    /// Written by consumer only.
    consumer_index: CachePadded<AtomicU64>,

    // Never change.
    chunk: *mut Chunk<T>,
    mask : u64,
    look_ahead_step: u64,
}

unsafe impl<T: Send> Send for SpscQueue<T>{}
unsafe impl<T: Send> Sync for SpscQueue<T>{}

impl<T> SpscQueue<T>{
    fn new(capacity: usize, max_look_ahead_step: usize) -> Result<Self, CapacityError>{
        let capacity = utils::round_to_power_of_two(capacity)?.max(4);
        let look_ahead_step = (capacity / 4).min(max_look_ahead_step).max(1);

        tracing::debug!(capacity, look_ahead_step, "spsc queue created");

        Ok(Self{
            producer_index: CachePadded::new(AtomicU64::new(0)),
            consumer_index: CachePadded::new(AtomicU64::new(0)),
            chunk: Chunk::construct(capacity),
            mask : (capacity - 1) as u64,
            look_ahead_step: look_ahead_step as u64,
        })
    }

    #[inline(always)]
    fn slot(&self, index: u64) -> &Slot<T>{
        unsafe{ (*self.chunk).slot_unchecked((index & self.mask) as usize) }
    }

    #[inline]
    fn capacity(&self) -> usize{
        (self.mask + 1) as usize
    }

    #[inline]
    fn len(&self) -> usize{
        utils::index_distance(&self.producer_index, &self.consumer_index) as usize
    }

    #[inline]
    fn is_empty(&self) -> bool{
        self.consumer_index.load(Ordering::Acquire) == self.producer_index.load(Ordering::Acquire)
    }
}

impl<T> Drop for SpscQueue<T>{
    fn drop(&mut self) {
        // Remaining values dropped by their slots.
        unsafe{ Chunk::destruct(self.chunk); }
    }
}

pub(super) fn split<T>(capacity: usize, max_look_ahead_step: usize)
    -> Result<(Producer<T>, Consumer<T>), CapacityError>
{
    let queue = Arc::new(SpscQueue::new(capacity, max_look_ahead_step)?);
    Ok((
        Producer{ queue: queue.clone(), producer_limit: 0 },
        Consumer{ queue }
    ))
}

/// Write side of the SPSC queue.
///
/// There is exactly one producer:
/// ```compile_fail
/// let (producer, _consumer) = chunked_queues::spsc::queue::<u32>(4).unwrap();
/// let second = producer.clone();
/// ```
pub struct Producer<T>{
    queue: Arc<SpscQueue<T>>,
    /// Slots below this index are known to be free.
    producer_limit: u64,
}

impl<T> Producer<T>{
    /// `Err(Full(value))` if there is no room. Queue state is unchanged in that case.
    #[inline]
    pub fn offer(&mut self, value: T) -> Result<(), Full<T>>{
        let producer_index = self.queue.producer_index.load(Ordering::Relaxed);

        if producer_index >= self.producer_limit && !self.offer_slow_path(producer_index){
            return Err(Full(value));
        }

        unsafe{ self.queue.slot(producer_index).write(value, Ordering::Release); }
        self.queue.producer_index.store(producer_index + 1, Ordering::Release);
        Ok(())
    }

    #[inline(never)]
    fn offer_slow_path(&mut self, producer_index: u64) -> bool{
        let look_ahead_step = self.queue.look_ahead_step;
        if self.queue.slot(producer_index + look_ahead_step).is_empty(Ordering::Acquire){
            // Consumer frees slots in order, so everything before it is free too.
            self.producer_limit = producer_index + look_ahead_step;
            true
        } else {
            self.queue.slot(producer_index).is_empty(Ordering::Acquire)
        }
    }

    /// Same as [offer](Self::offer) for SPSC.
    #[inline]
    pub fn relaxed_offer(&mut self, value: T) -> Result<(), Full<T>>{
        self.offer(value)
    }

    /// Calls `supply` once per written element, up to `limit` times.
    /// Returns number of elements written; less than `limit` only if the queue filled up.
    pub fn fill<F>(&mut self, mut supply: F, limit: usize) -> usize
        where F: FnMut() -> T
    {
        let queue = &*self.queue;
        let look_ahead_step = queue.look_ahead_step;
        let producer_index = queue.producer_index.load(Ordering::Relaxed);
        let limit = limit as u64;

        let mut i = 0;
        while i < limit {
            let index = producer_index + i;
            if queue.slot(index + look_ahead_step).is_empty(Ordering::Acquire){
                let look_ahead_limit = look_ahead_step.min(limit - i);
                for j in 0..look_ahead_limit {
                    unsafe{ queue.slot(index + j).write(supply(), Ordering::Release); }
                    queue.producer_index.store(index + j + 1, Ordering::Release);
                }
                i += look_ahead_limit;
            } else {
                let slot = queue.slot(index);
                if !slot.is_empty(Ordering::Acquire){
                    return i as usize;
                }
                unsafe{ slot.write(supply(), Ordering::Release); }
                queue.producer_index.store(index + 1, Ordering::Release);
                i += 1;
            }
        }
        limit as usize
    }

    /// [fill](Self::fill) up to capacity.
    #[inline]
    pub fn fill_all<F>(&mut self, supply: F) -> usize
        where F: FnMut() -> T
    {
        let capacity = self.capacity();
        self.fill(supply, capacity)
    }

    /// Fills while `exit` keeps running, calling `wait` whenever the queue is full.
    pub fn fill_with<F, W, E>(&mut self, mut supply: F, mut wait: W, mut exit: E)
        where F: FnMut() -> T, W: WaitStrategy, E: ExitCondition
    {
        let queue = &*self.queue;
        let look_ahead_step = queue.look_ahead_step;
        let mut producer_index = queue.producer_index.load(Ordering::Relaxed);

        let mut idle_counter = 0;
        while exit.keep_running() {
            if queue.slot(producer_index + look_ahead_step).is_empty(Ordering::Acquire){
                for _ in 0..look_ahead_step {
                    unsafe{ queue.slot(producer_index).write(supply(), Ordering::Release); }
                    producer_index += 1;
                    queue.producer_index.store(producer_index, Ordering::Release);
                }
                idle_counter = 0;
            } else {
                let slot = queue.slot(producer_index);
                if !slot.is_empty(Ordering::Acquire){
                    idle_counter = wait.idle(idle_counter);
                    continue;
                }
                unsafe{ slot.write(supply(), Ordering::Release); }
                producer_index += 1;
                queue.producer_index.store(producer_index, Ordering::Release);
                idle_counter = 0;
            }
        }
    }

    #[inline]
    pub fn look_ahead_step(&self) -> usize{
        self.queue.look_ahead_step as usize
    }
}

/// Read side of the SPSC queue.
///
/// ```compile_fail
/// let (_producer, consumer) = chunked_queues::spsc::queue::<u32>(4).unwrap();
/// let second = consumer.clone();
/// ```
pub struct Consumer<T>{
    queue: Arc<SpscQueue<T>>,
}

impl<T> Consumer<T>{
    /// `None` if empty. Never spins: a producer store not yet visible reads as empty.
    #[inline]
    pub fn poll(&mut self) -> Option<T>{
        let consumer_index = self.queue.consumer_index.load(Ordering::Relaxed);
        let slot = self.queue.slot(consumer_index);
        if slot.is_empty(Ordering::Acquire){
            return None;
        }

        let value = unsafe{ slot.take(Ordering::Release) };
        self.queue.consumer_index.store(consumer_index + 1, Ordering::Release);
        Some(value)
    }

    /// Head element, without removing it.
    ///
    /// `&mut self`, so the reference never crosses to another thread through `&Consumer`.
    #[inline]
    pub fn peek(&mut self) -> Option<&T>{
        let consumer_index = self.queue.consumer_index.load(Ordering::Relaxed);
        let slot = self.queue.slot(consumer_index);
        if slot.is_empty(Ordering::Acquire){
            return None;
        }
        // Producer never touches an occupied slot.
        Some(unsafe{ slot.get() })
    }

    /// Same as [poll](Self::poll) for SPSC.
    #[inline]
    pub fn relaxed_poll(&mut self) -> Option<T>{
        self.poll()
    }

    /// Same as [peek](Self::peek) for SPSC.
    #[inline]
    pub fn relaxed_peek(&mut self) -> Option<&T>{
        self.peek()
    }

    /// Passes up to `limit` elements to `consume`. Returns how many were passed.
    pub fn drain<F>(&mut self, mut consume: F, limit: usize) -> usize
        where F: FnMut(T)
    {
        let queue = &*self.queue;
        let consumer_index = queue.consumer_index.load(Ordering::Relaxed);

        for i in 0..limit as u64 {
            let index = consumer_index + i;
            let slot = queue.slot(index);
            if slot.is_empty(Ordering::Acquire){
                return i as usize;
            }
            let value = unsafe{ slot.take(Ordering::Release) };
            queue.consumer_index.store(index + 1, Ordering::Release);
            consume(value);
        }
        limit
    }

    /// [drain](Self::drain) up to capacity.
    #[inline]
    pub fn drain_all<F>(&mut self, consume: F) -> usize
        where F: FnMut(T)
    {
        let capacity = self.capacity();
        self.drain(consume, capacity)
    }

    /// Drains while `exit` keeps running, calling `wait` whenever the queue is empty.
    pub fn drain_with<F, W, E>(&mut self, mut consume: F, mut wait: W, mut exit: E)
        where F: FnMut(T), W: WaitStrategy, E: ExitCondition
    {
        let queue = &*self.queue;
        let mut consumer_index = queue.consumer_index.load(Ordering::Relaxed);

        let mut idle_counter = 0;
        while exit.keep_running() {
            let slot = queue.slot(consumer_index);
            if slot.is_empty(Ordering::Acquire){
                idle_counter = wait.idle(idle_counter);
                continue;
            }
            idle_counter = 0;
            let value = unsafe{ slot.take(Ordering::Release) };
            consumer_index += 1;
            queue.consumer_index.store(consumer_index, Ordering::Release);
            consume(value);
        }
    }
}

macro_rules! queue_indicators {
    ($handle:ident) => {
        impl<T> $handle<T>{
            /// Estimate under concurrent use.
            #[inline]
            pub fn len(&self) -> usize{
                self.queue.len()
            }

            #[inline]
            pub fn is_empty(&self) -> bool{
                self.queue.is_empty()
            }

            #[inline]
            pub fn capacity(&self) -> usize{
                self.queue.capacity()
            }

            /// Total elements ever written.
            #[inline]
            pub fn current_producer_index(&self) -> u64{
                self.queue.producer_index.load(Ordering::Acquire)
            }

            /// Total elements ever read.
            #[inline]
            pub fn current_consumer_index(&self) -> u64{
                self.queue.consumer_index.load(Ordering::Acquire)
            }
        }

        impl<T> fmt::Debug for $handle<T>{
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($handle))
                    .field("len", &self.len())
                    .field("capacity", &self.capacity())
                    .finish_non_exhaustive()
            }
        }
    };
}

queue_indicators!(Producer);
queue_indicators!(Consumer);

//! Linked-chunk MPSC engine.
//!
//! Both indices count elements times 2. The low bit of the producer index is set while
//! one producer installs a new chunk; other producers spin until it clears.
//!
//! Slot for index `i` in a chunk of length `n` is `(i & mask) >> 1`, with `mask = (n-1) << 1`.
//! A chunk never holds more than `n-1` elements: the slot at the index where a resize was
//! claimed receives the JUMP marker, and the element for that index goes into the new chunk
//! at the same position.

use std::cell::UnsafeCell;
use crossbeam_utils::CachePadded;
use crate::chunk::{Chunk, Slot, SlotState, destruct_chain};
use crate::error::Full;
use crate::sync::{spin_loop, AtomicPtr, AtomicU64, Ordering};
use crate::utils::{bittest_u64, index_distance};
use crate::wait::{ExitCondition, WaitStrategy};

/// Batch size used by `fill_all` and `fill_with`.
pub(crate) const FILL_BATCH: usize = 4096;

/// Growth policy of a linked-chunk queue.
///
/// All index-valued arguments and results are in doubled units.
pub(crate) trait ChunkPolicy{
    /// Room left in the queue, given producer and consumer index. May be "negative".
    fn available_in_queue(&self, producer_index: u64, consumer_index: u64) -> i64;

    /// Slot count of the chunk that follows a full chunk of `current_len` slots.
    fn next_chunk_len(&self, current_len: usize) -> usize;

    /// Elements a chunk with `mask` may hold.
    fn current_chunk_capacity(&self, mask: u64) -> u64;

    /// Max elements in queue.
    fn capacity(&self) -> usize;
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum SlowPath{
    /// Limit raised (or already high enough) - claim the index.
    Claim,
    /// Lost a race - start over.
    Retry,
    Full,
    /// Resize bit set by us - install new chunk.
    Resize,
}

struct ConsumerFields<T>{
    index: AtomicU64,
    // Touched by the single consumer only.
    chunk: UnsafeCell<*mut Chunk<T>>,
    mask : UnsafeCell<u64>,
}

struct ColdProducerFields<T>{
    /// Producers may claim indices below this without looking at the consumer.
    limit: AtomicU64,
    mask : AtomicU64,
    chunk: AtomicPtr<Chunk<T>>,
}

pub(crate) struct BaseQueue<T, P: ChunkPolicy>{
    producer_index: CachePadded<AtomicU64>,
    consumer: CachePadded<ConsumerFields<T>>,
    cold_producer: CachePadded<ColdProducerFields<T>>,
    policy: P,
}

unsafe impl<T: Send, P: ChunkPolicy + Send> Send for BaseQueue<T, P>{}
unsafe impl<T: Send, P: ChunkPolicy + Sync> Sync for BaseQueue<T, P>{}

#[inline(always)]
fn mask_for_len(len: usize) -> u64{
    ((len - 1) as u64) << 1
}

#[inline(always)]
fn len_for_mask(mask: u64) -> usize{
    ((mask >> 1) + 1) as usize
}

/// `chunk` must be alive, `mask` must belong to it.
#[inline(always)]
unsafe fn slot<'a, T>(chunk: *mut Chunk<T>, index: u64, mask: u64) -> &'a Slot<T>{
    (*chunk).slot_unchecked(((index & mask) >> 1) as usize)
}

impl<T, P: ChunkPolicy> BaseQueue<T, P>{
    /// `initial_chunk_len` must be a power of 2, 2 or more.
    pub fn new(initial_chunk_len: usize, policy: P) -> Self{
        debug_assert!(initial_chunk_len >= 2 && initial_chunk_len.is_power_of_two());

        let chunk = Chunk::construct(initial_chunk_len);
        let mask  = mask_for_len(initial_chunk_len);

        Self{
            producer_index: CachePadded::new(AtomicU64::new(0)),
            consumer: CachePadded::new(ConsumerFields{
                index: AtomicU64::new(0),
                chunk: UnsafeCell::new(chunk),
                mask : UnsafeCell::new(mask),
            }),
            cold_producer: CachePadded::new(ColdProducerFields{
                // A chunk of n slots takes n-1 elements before resizing.
                limit: AtomicU64::new(mask),
                mask : AtomicU64::new(mask),
                chunk: AtomicPtr::new(chunk),
            }),
            policy
        }
    }

    #[inline]
    pub fn offer(&self, value: T) -> Result<(), Full<T>>{
        let (producer_index, chunk, mask) = loop {
            let producer_limit = self.cold_producer.limit.load(Ordering::Acquire);
            let producer_index = self.producer_index.load(Ordering::Acquire);
            if bittest_u64::<0>(producer_index){
                // resize in progress
                spin_loop();
                continue;
            }

            // Only usable after the index CAS below succeeds.
            let mask  = self.cold_producer.mask.load(Ordering::Acquire);
            let chunk = self.cold_producer.chunk.load(Ordering::Acquire);

            if producer_limit <= producer_index {
                match self.offer_slow_path(mask, producer_index, producer_limit){
                    SlowPath::Claim  => {},
                    SlowPath::Retry  => continue,
                    SlowPath::Full   => return Err(Full(value)),
                    SlowPath::Resize => {
                        unsafe{ self.resize(mask, chunk, producer_index, value); }
                        return Ok(());
                    }
                }
            }

            if self.producer_index.compare_exchange_weak(
                producer_index, producer_index + 2,
                Ordering::AcqRel, Ordering::Relaxed
            ).is_ok() {
                break (producer_index, chunk, mask);
            }
        };

        // Index published before the element. Consumer spins on the gap.
        unsafe{ slot(chunk, producer_index, mask).write(value, Ordering::Release); }
        Ok(())
    }

    #[inline(never)]
    fn offer_slow_path(&self, mask: u64, producer_index: u64, producer_limit: u64) -> SlowPath{
        let consumer_index = self.consumer.index.load(Ordering::Acquire);
        let chunk_capacity = self.policy.current_chunk_capacity(mask);

        if consumer_index + chunk_capacity > producer_index {
            if self.cold_producer.limit.compare_exchange(
                producer_limit, consumer_index + chunk_capacity,
                Ordering::AcqRel, Ordering::Relaxed
            ).is_ok() {
                SlowPath::Claim
            } else {
                SlowPath::Retry
            }
        } else if self.policy.available_in_queue(producer_index, consumer_index) <= 0 {
            SlowPath::Full
        } else if self.producer_index.compare_exchange(
            producer_index, producer_index + 1,
            Ordering::AcqRel, Ordering::Relaxed
        ).is_ok() {
            SlowPath::Resize
        } else {
            SlowPath::Retry
        }
    }

    /// Caller must own the resize bit for `producer_index`, and `old_chunk`/`old_mask`
    /// must be the producer chunk it was claimed against.
    #[cold]
    unsafe fn resize(&self, old_mask: u64, old_chunk: *mut Chunk<T>, producer_index: u64, value: T){
        let new_len   = self.policy.next_chunk_len(len_for_mask(old_mask));
        let new_chunk = Chunk::construct(new_len);
        let new_mask  = mask_for_len(new_len);

        self.cold_producer.chunk.store(new_chunk, Ordering::Release);
        self.cold_producer.mask.store(new_mask, Ordering::Release);

        slot(new_chunk, producer_index, new_mask).write(value, Ordering::Release);
        (*old_chunk).set_next(new_chunk, Ordering::Release);

        let consumer_index = self.consumer.index.load(Ordering::Acquire);
        let available = self.policy.available_in_queue(producer_index, consumer_index);
        if available <= 0 {
            tracing::error!(producer_index, consumer_index, "resize claimed without free room in queue");
            panic!("resize claimed without free room in queue");
        }

        tracing::trace!(producer_index = producer_index >> 1, chunk_len = new_len, "linked new chunk");

        // Never set the limit past the new chunk. Racing limit CASes fail against it.
        self.cold_producer.limit.store(producer_index + new_mask.min(available as u64), Ordering::Release);

        // Clears the resize bit.
        self.producer_index.store(producer_index + 2, Ordering::Release);

        // Index visible before the element, as with regular offers.
        slot(old_chunk, producer_index, old_mask).write_jump(Ordering::Release);
    }

    /// Consumer moves to `next` chunk, and frees the one it leaves.
    ///
    /// Single consumer only. Current consumer chunk must have a JUMP at the consumer index.
    #[cold]
    unsafe fn hop_to_next_chunk(&self) -> (*mut Chunk<T>, u64){
        let old_chunk = *self.consumer.chunk.get();
        let next_chunk = (*old_chunk).next(Ordering::Acquire);
        if next_chunk.is_null() {
            tracing::error!("JUMP without linked chunk");
            panic!("JUMP without linked chunk");
        }

        // All indices routed through the old chunk are behind us.
        Chunk::destruct(old_chunk);

        let next_mask = mask_for_len((*next_chunk).capacity());
        *self.consumer.chunk.get() = next_chunk;
        *self.consumer.mask.get()  = next_mask;
        (next_chunk, next_mask)
    }

    /// Slot for `index` in the chunk after a JUMP. It must hold the value.
    #[inline]
    unsafe fn new_chunk_slot(&self, index: u64) -> &Slot<T>{
        let (chunk, mask) = self.hop_to_next_chunk();
        let slot = slot(chunk, index, mask);
        if slot.state(Ordering::Acquire) != SlotState::Value {
            tracing::error!(index = index >> 1, "new chunk must have at least one element");
            panic!("new chunk must have at least one element");
        }
        slot
    }

    #[inline(always)]
    unsafe fn take(&self, slot: &Slot<T>, index: u64) -> T{
        let value = slot.take(Ordering::Relaxed);
        self.consumer.index.store(index + 2, Ordering::Release);
        value
    }

    /// Single consumer only.
    ///
    /// `None` only if the queue is empty. If an element is claimed but not yet written,
    /// spins until it shows up.
    pub unsafe fn poll(&self) -> Option<T>{
        let index = self.consumer.index.load(Ordering::Relaxed);
        let chunk = *self.consumer.chunk.get();
        let mask  = *self.consumer.mask.get();

        let slot = slot(chunk, index, mask);
        let mut state = slot.state(Ordering::Acquire);
        if state == SlotState::Empty {
            if index == self.producer_index.load(Ordering::Acquire) {
                return None;
            }
            loop {
                spin_loop();
                state = slot.state(Ordering::Acquire);
                if state != SlotState::Empty { break; }
            }
        }

        if state == SlotState::Jump {
            let slot = self.new_chunk_slot(index);
            return Some(self.take(slot, index));
        }
        Some(self.take(slot, index))
    }

    /// Single consumer only. `None` may be spurious.
    pub unsafe fn relaxed_poll(&self) -> Option<T>{
        let index = self.consumer.index.load(Ordering::Relaxed);
        let chunk = *self.consumer.chunk.get();
        let mask  = *self.consumer.mask.get();

        let slot = slot(chunk, index, mask);
        match slot.state(Ordering::Acquire){
            SlotState::Empty => None,
            SlotState::Value => Some(self.take(slot, index)),
            SlotState::Jump  => {
                let slot = self.new_chunk_slot(index);
                Some(self.take(slot, index))
            }
        }
    }

    /// Single consumer only. Reference is valid until the next consumer operation.
    ///
    /// May move the consumer to the next chunk.
    pub unsafe fn peek(&self) -> Option<&T>{
        let index = self.consumer.index.load(Ordering::Relaxed);
        let chunk = *self.consumer.chunk.get();
        let mask  = *self.consumer.mask.get();

        let slot = slot(chunk, index, mask);
        let mut state = slot.state(Ordering::Acquire);
        if state == SlotState::Empty {
            if index == self.producer_index.load(Ordering::Acquire) {
                return None;
            }
            loop {
                spin_loop();
                state = slot.state(Ordering::Acquire);
                if state != SlotState::Empty { break; }
            }
        }

        if state == SlotState::Jump {
            return Some(self.new_chunk_slot(index).get());
        }
        Some(slot.get())
    }

    /// Single consumer only. `None` may be spurious.
    pub unsafe fn relaxed_peek(&self) -> Option<&T>{
        let index = self.consumer.index.load(Ordering::Relaxed);
        let chunk = *self.consumer.chunk.get();
        let mask  = *self.consumer.mask.get();

        let slot = slot(chunk, index, mask);
        match slot.state(Ordering::Acquire){
            SlotState::Empty => None,
            SlotState::Value => Some(slot.get()),
            SlotState::Jump  => Some(self.new_chunk_slot(index).get()),
        }
    }

    /// Claims up to `batch_size` consecutive indices with one CAS, then writes them.
    /// Resize claims exactly one.
    ///
    /// Returns 0 only if the queue is full, or `batch_size` is 0.
    pub fn fill<F>(&self, mut supply: F, batch_size: usize) -> usize
        where F: FnMut() -> T
    {
        let (producer_index, batch_index, chunk, mask) = loop {
            let producer_limit = self.cold_producer.limit.load(Ordering::Acquire);
            let producer_index = self.producer_index.load(Ordering::Acquire);
            if bittest_u64::<0>(producer_index){
                spin_loop();
                continue;
            }

            let mask  = self.cold_producer.mask.load(Ordering::Acquire);
            let chunk = self.cold_producer.chunk.load(Ordering::Acquire);

            if producer_limit <= producer_index {
                match self.offer_slow_path(mask, producer_index, producer_limit){
                    // Limit moved - recompute the batch against it.
                    SlowPath::Claim | SlowPath::Retry => continue,
                    SlowPath::Full   => return 0,
                    SlowPath::Resize => {
                        unsafe{ self.resize(mask, chunk, producer_index, supply()); }
                        return 1;
                    }
                }
            }

            let batch_end   = producer_index.saturating_add((batch_size as u64).saturating_mul(2));
            let batch_index = producer_limit.min(batch_end);
            if self.producer_index.compare_exchange_weak(
                producer_index, batch_index,
                Ordering::AcqRel, Ordering::Relaxed
            ).is_ok() {
                break (producer_index, batch_index, chunk, mask);
            }
        };

        let claimed = ((batch_index - producer_index) / 2) as usize;
        for i in 0..claimed as u64 {
            unsafe{ slot(chunk, producer_index + 2 * i, mask).write(supply(), Ordering::Release); }
        }
        claimed
    }

    /// Fills in [FILL_BATCH] steps until full, or until more than capacity was written.
    pub fn fill_all<F>(&self, mut supply: F) -> usize
        where F: FnMut() -> T
    {
        let capacity = self.policy.capacity();
        let mut result = 0;
        loop {
            let filled = self.fill(&mut supply, FILL_BATCH);
            if filled == 0 {
                return result;
            }
            result += filled;
            if result > capacity {
                return result;
            }
        }
    }

    pub fn fill_with<F, W, E>(&self, mut supply: F, mut wait: W, mut exit: E)
        where F: FnMut() -> T, W: WaitStrategy, E: ExitCondition
    {
        while exit.keep_running() {
            while self.fill(&mut supply, FILL_BATCH) != 0 && exit.keep_running() {}

            let mut idle_counter = 0;
            while exit.keep_running() && self.fill(&mut supply, FILL_BATCH) == 0 {
                idle_counter = wait.idle(idle_counter);
            }
        }
    }

    /// Single consumer only.
    pub unsafe fn drain<F>(&self, mut consume: F, limit: usize) -> usize
        where F: FnMut(T)
    {
        for i in 0..limit {
            match self.relaxed_poll(){
                Some(value) => consume(value),
                None => return i,
            }
        }
        limit
    }

    /// Single consumer only.
    pub unsafe fn drain_with<F, W, E>(&self, mut consume: F, mut wait: W, mut exit: E)
        where F: FnMut(T), W: WaitStrategy, E: ExitCondition
    {
        let mut idle_counter = 0;
        while exit.keep_running() {
            match self.relaxed_poll(){
                Some(value) => {
                    idle_counter = 0;
                    consume(value);
                }
                None => idle_counter = wait.idle(idle_counter),
            }
        }
    }

    /// Over-estimate under concurrent offers. Never below zero.
    #[inline]
    pub fn len(&self) -> usize{
        (index_distance(&self.producer_index, &self.consumer.index) >> 1) as usize
    }

    /// Consumer index read first: a racing offer can only make this return `false`.
    #[inline]
    pub fn is_empty(&self) -> bool{
        let consumer_index = self.consumer.index.load(Ordering::Acquire);
        consumer_index == self.producer_index.load(Ordering::Acquire)
    }

    #[inline]
    pub fn capacity(&self) -> usize{
        self.policy.capacity()
    }

    #[inline]
    pub fn current_producer_index(&self) -> u64{
        self.producer_index.load(Ordering::Acquire) / 2
    }

    #[inline]
    pub fn current_consumer_index(&self) -> u64{
        self.consumer.index.load(Ordering::Acquire) / 2
    }

    /// Slot count of the chunk producers currently write to.
    #[inline]
    pub fn producer_chunk_len(&self) -> usize{
        len_for_mask(self.cold_producer.mask.load(Ordering::Acquire))
    }
}

impl<T, P: ChunkPolicy> Drop for BaseQueue<T, P>{
    fn drop(&mut self) {
        // Chunks behind the consumer are already freed.
        unsafe{ destruct_chain(*self.consumer.chunk.get_mut()); }
    }
}

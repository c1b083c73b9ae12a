//! Fixed-size circular slot array, the unit both queues store elements in.
//!
//! The header `next` pointer is the chunk's reserved link slot: null until a producer
//! links a successor chunk. SPSC never links.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::null_mut;
use crate::dynamic_array::DynamicArray;
use crate::sync::{AtomicPtr, AtomicU8, Ordering};

const EMPTY: u8 = 0;
const VALUE: u8 = 1;
const JUMP : u8 = 2;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum SlotState{
    Empty,
    Value,
    /// Value for this index lives in the next chunk.
    Jump,
}

/// Tag + payload. Payload is initialized iff tag is `VALUE`.
pub(crate) struct Slot<T>{
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T>{
    #[inline]
    fn new() -> Self{
        Self{
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline(always)]
    pub fn state(&self, load_ordering: Ordering) -> SlotState{
        match self.state.load(load_ordering){
            EMPTY => SlotState::Empty,
            VALUE => SlotState::Value,
            _     => SlotState::Jump,
        }
    }

    #[inline(always)]
    pub fn is_empty(&self, load_ordering: Ordering) -> bool{
        self.state.load(load_ordering) == EMPTY
    }

    /// Slot must be empty, and exclusively claimed by the caller.
    #[inline(always)]
    pub unsafe fn write(&self, value: T, store_ordering: Ordering){
        (*self.value.get()).write(value);
        self.state.store(VALUE, store_ordering);
    }

    #[inline(always)]
    pub fn write_jump(&self, store_ordering: Ordering){
        self.state.store(JUMP, store_ordering);
    }

    /// Slot must hold a value, observed by the calling (single) consumer.
    #[inline(always)]
    pub unsafe fn take(&self, store_ordering: Ordering) -> T{
        let value = (*self.value.get()).assume_init_read();
        self.state.store(EMPTY, store_ordering);
        value
    }

    /// Slot must hold a value. Reference valid until the value is taken.
    #[inline(always)]
    pub unsafe fn get(&self) -> &T{
        (*self.value.get()).assume_init_ref()
    }
}

impl<T> Drop for Slot<T>{
    fn drop(&mut self) {
        // Relaxed because &mut self
        if self.state.load(Ordering::Relaxed) == VALUE {
            unsafe{ (*self.value.get()).assume_init_drop(); }
        }
    }
}

pub(crate) struct Header<T>{
    next: AtomicPtr<Chunk<T>>,
}

#[repr(transparent)]
pub(crate) struct Chunk<T>(
    DynamicArray< Header<T>, Slot<T> >
);

impl<T> Chunk<T>{
    /// `len` is the slot count; must be a power of 2.
    pub fn construct(len: usize) -> *mut Self{
        debug_assert!(len.is_power_of_two());
        let header = Header{ next: AtomicPtr::new(null_mut()) };
        let this = DynamicArray::<Header<T>, Slot<T>>::construct_with(header, len, |_| Slot::new());

        // This is ok, due to transparent
        this as *mut Self
    }

    /// Drops every still-stored value.
    /// Does not follow `next`.
    pub unsafe fn destruct(this: *mut Self){
        DynamicArray::<Header<T>, Slot<T>>::destruct(this as *mut DynamicArray<Header<T>, Slot<T>>);
    }

    #[inline(always)]
    pub fn next(&self, load_ordering: Ordering) -> *mut Self{
        self.0.header().next.load(load_ordering)
    }

    #[inline(always)]
    pub fn set_next(&self, ptr: *mut Self, store_ordering: Ordering){
        self.0.header().next.store(ptr, store_ordering);
    }

    #[inline(always)]
    pub unsafe fn slot_unchecked(&self, index: usize) -> &Slot<T>{
        debug_assert!(index < self.capacity());
        self.0.slice().get_unchecked(index)
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize{
        self.0.len()
    }
}

/// Destructs `first` and every chunk linked after it.
pub(crate) unsafe fn destruct_chain<T>(first: *mut Chunk<T>){
    let mut chunk_ptr = first;
    while !chunk_ptr.is_null() {
        // Relaxed because exclusive access
        let next_chunk_ptr = (*chunk_ptr).next(Ordering::Relaxed);
        Chunk::destruct(chunk_ptr);
        chunk_ptr = next_chunk_ptr;
    }
}

//! Header + array in a single heap allocation.
//!
//! Length is known only at runtime, so this can't be a plain struct with an array
//! field. Used as the backing storage of queue chunks: the header holds the link to
//! the next chunk, the array holds the slots.

#[cfg(test)]
#[cfg(not(loom))]
mod test;

use std::mem;
use std::alloc::{Layout, handle_alloc_error};

#[repr(C)]
pub struct DynamicArray<Header, T>{
    header: Header,
    array_len : usize,
    array: [T; 0],
}

impl<Header, T> DynamicArray<Header, T>{
    #[inline]
    fn layout(len: usize) -> Layout{
        let size = mem::size_of::<T>()
            .checked_mul(len)
            .and_then(|array_size| array_size.checked_add(mem::size_of::<Self>()));
        match size.map(|size| Layout::from_size_align(size, mem::align_of::<Self>())) {
            Some(Ok(layout)) => layout,
            _ => panic!("DynamicArray capacity overflow: {len} elements"),
        }
    }

    /// Every element constructed by `init(index)`.
    pub fn construct_with<F>(header: Header, len: usize, mut init: F) -> *mut Self
        where F: FnMut(usize) -> T
    {
        unsafe{
            let this = Self::construct_uninit(header, len);
            let array = (*this).array.as_mut_ptr();
            for index in 0..len{
                std::ptr::write(array.add(index), init(index));
            }
            this
        }
    }

    /// array is not initialized
    unsafe fn construct_uninit(header: Header, len: usize) -> *mut Self {
        let layout = Self::layout(len);
        let allocation = std::alloc::alloc(layout) as *mut Self;
        if allocation.is_null(){
            handle_alloc_error(layout);
        }

        std::ptr::write(std::ptr::addr_of_mut!((*allocation).header), header);
        std::ptr::write(std::ptr::addr_of_mut!((*allocation).array_len), len);

        allocation
    }

    /// Unsafe due to potential double-free, use-after-free
    pub unsafe fn destruct(this: *mut Self) {
        if mem::needs_drop::<T>() {
            for item in (*this).slice_mut(){
                std::ptr::drop_in_place(item);
            }
        }

        Self::destruct_uninit(this);
    }

    /// Drops header only. Array elements must be already dropped (or never constructed).
    unsafe fn destruct_uninit(this: *mut Self) {
        if mem::needs_drop::<Header>() {
            std::ptr::drop_in_place(&mut (*this).header);
        }

        let layout = Self::layout((*this).array_len);
        std::alloc::dealloc(this as *mut u8, layout);
    }

    #[inline]
    pub fn header(&self) -> &Header{
        &self.header
    }

    #[inline]
    pub fn slice(&self) -> &[T] {
        unsafe {
            std::slice::from_raw_parts(self.array.as_ptr(), self.array_len)
        }
    }

    #[inline]
    pub fn slice_mut(&mut self) -> &mut [T] {
        unsafe {
            std::slice::from_raw_parts_mut(self.array.as_mut_ptr(), self.array_len)
        }
    }

    #[inline]
    pub fn len(&self) -> usize{
        self.array_len
    }
}

use crate::dynamic_array::DynamicArray;
use std::sync::atomic::{AtomicUsize, Ordering};
use itertools::assert_equal;

struct Header<'a>{
    id : u8,
    drops: &'a AtomicUsize,
}
impl<'a> Drop for Header<'a>{
    fn drop(&mut self) {
        self.drops.fetch_add(100, Ordering::Relaxed);
    }
}

struct Data<'a>{
    i : usize,
    drops: &'a AtomicUsize,
}
impl<'a> Drop for Data<'a>{
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn construct_with_test(){
    let drops = AtomicUsize::new(0);
    let array = DynamicArray::<Header, Data>::construct_with(
        Header { id: 7, drops: &drops },
        8,
        |i| Data { i: i * 10, drops: &drops }
    );

    unsafe{
        assert_eq!((*array).len(), 8);
        assert_eq!((*array).header().id, 7);
        assert_equal((*array).slice().iter().map(|data| data.i), (0..8).map(|i| i * 10));

        (*array).slice_mut()[1].i = 800;
        assert_eq!((*array).slice()[1].i, 800);

        DynamicArray::destruct(array);
    }

    // 8 elements + header
    assert_eq!(drops.load(Ordering::Relaxed), 108);
}

#[test]
fn destruct_uninit_test(){
    let drops = AtomicUsize::new(0);
    unsafe{
        let array = DynamicArray::<Header, Data>::construct_uninit(
            Header { id: 1, drops: &drops },
            4
        );
        assert_eq!((*array).len(), 4);
        DynamicArray::destruct_uninit(array);
    }

    // elements never constructed - only header dropped
    assert_eq!(drops.load(Ordering::Relaxed), 100);
}

#[test]
fn over_aligned_elements_test(){
    #[repr(align(64))]
    struct Padded(u64);

    let array = DynamicArray::<u8, Padded>::construct_with(0, 3, |i| Padded(i as u64));
    unsafe{
        let slice = (*array).slice();
        assert_eq!(slice.as_ptr() as usize % 64, 0);
        assert_equal(slice.iter().map(|p| p.0), [0, 1, 2]);
        DynamicArray::destruct(array);
    }
}

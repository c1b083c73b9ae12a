use crate::sync::thread;
use crate::{mpsc, spsc};

pub(crate) struct Data<F: FnMut()>{
    pub id : usize,
    _name: String,
    on_destroy: F
}

impl<F: FnMut()> Data<F>{
    pub fn from(i:usize, on_destroy: F) -> Self {
        Self{
            id : i,
            _name: i.to_string(),
            on_destroy
        }
    }
}

impl<F: FnMut()> Drop for Data<F>{
    fn drop(&mut self) {
        (self.on_destroy)();
    }
}

/// Pushes `(producer_id, seq)` from every producer, and checks that the consumer sees each
/// pair exactly once, in `seq` order per producer.
pub(crate) fn mpsc_mt_test_impl(
    producers_count: usize,
    per_producer: usize,
    initial_capacity: usize,
    max_capacity: usize
){
    let (producer, mut consumer) = mpsc::chunked::<(usize, usize)>(initial_capacity, max_capacity).unwrap();

    let mut threads = Vec::new();
    for producer_id in 0..producers_count{
        let producer = producer.clone();
        threads.push(thread::spawn(move || {
            for seq in 0..per_producer{
                let mut value = (producer_id, seq);
                loop {
                    match producer.offer(value){
                        Ok(()) => break,
                        Err(full) => {
                            assert!(producer.len() <= producer.capacity());
                            value = full.into_inner();
                            thread::yield_now();
                        }
                    }
                }
            }
        }));
    }
    drop(producer);

    let mut next_seq = vec![0; producers_count];
    let mut received = 0;
    while received < producers_count * per_producer {
        match consumer.poll(){
            Some((producer_id, seq)) => {
                assert_eq!(seq, next_seq[producer_id]);
                next_seq[producer_id] += 1;
                received += 1;
            }
            None => thread::yield_now(),
        }
    }

    for thread in threads{
        thread.join().unwrap();
    }

    assert!(next_seq.iter().all(|&seq| seq == per_producer));
    assert!(consumer.poll().is_none());
    assert!(consumer.is_empty());
}

/// Sends `0..len` through an spsc queue, consumer checks the order.
pub(crate) fn spsc_mt_test_impl(capacity: usize, len: usize){
    let (mut producer, mut consumer) = spsc::queue::<usize>(capacity).unwrap();

    let writer = thread::spawn(move || {
        for i in 0..len{
            let mut value = i;
            while let Err(full) = producer.offer(value){
                value = full.into_inner();
                thread::yield_now();
            }
        }
    });

    let mut expected = 0;
    while expected < len {
        match consumer.poll(){
            Some(value) => {
                assert_eq!(value, expected);
                expected += 1;
            }
            None => thread::yield_now(),
        }
    }

    writer.join().unwrap();
    assert!(consumer.poll().is_none());
}

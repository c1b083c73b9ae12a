//! Multi-producer single-consumer, growing by linked chunks.
//!
//! The queue starts with one chunk. When producers catch up with the consumer inside it,
//! one producer links a new chunk and the rest keep going there. Elements are never
//! copied between chunks: the consumer follows a JUMP marker left in the old chunk, and
//! frees the old chunk as it leaves it.
//!
//! [Producer] is `Clone + Send + Sync`. [Consumer] is unique, and its operations take `&mut self`.
//!
//! ```
//! use std::thread;
//! use chunked_queues::mpsc;
//!
//! let (producer, mut consumer) = mpsc::chunked::<usize>(2, 64).unwrap();
//! let threads: Vec<_> = (0..4).map(|t| {
//!     let producer = producer.clone();
//!     thread::spawn(move || {
//!         for i in 0..10 {
//!             while producer.offer(t * 10 + i).is_err() {
//!                 thread::yield_now();
//!             }
//!         }
//!     })
//! }).collect();
//!
//! let mut received = Vec::new();
//! while received.len() < 40 {
//!     if let Some(value) = consumer.poll() {
//!         received.push(value);
//!     }
//! }
//! for thread in threads { thread.join().unwrap(); }
//!
//! received.sort();
//! assert_eq!(received, (0..40).collect::<Vec<_>>());
//! ```

mod base;
mod chunked;

pub use chunked::*;

//! Progress contracts for the streaming `fill_with` / `drain_with` loops.
//!
//! Any `FnMut(usize) -> usize` is a [WaitStrategy], any `FnMut() -> bool` is an
//! [ExitCondition]:
//!
//! ```
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use chunked_queues::spsc;
//!
//! let (mut producer, _consumer) = spsc::queue::<usize>(16).unwrap();
//! let stop = AtomicBool::new(false);
//! let mut next = 0;
//! producer.fill_with(
//!     || { next += 1; next },
//!     |idle_counter: usize| { stop.store(true, Ordering::Relaxed); idle_counter + 1 },
//!     || !stop.load(Ordering::Relaxed)
//! );
//! assert_eq!(producer.len(), 16);
//! ```

use std::marker::PhantomData;
use std::time::Duration;
use spin::relax::RelaxStrategy;
use crate::sync::{park_timeout, spin_loop, thread};

/// Invoked when a streaming loop could not make progress.
pub trait WaitStrategy{
    /// `idle_counter` is 0 on the first idle call after progress was made; whatever is
    /// returned is passed to the next call. Return 0 to restart the progression.
    fn idle(&mut self, idle_counter: usize) -> usize;
}

impl<F> WaitStrategy for F
    where F: FnMut(usize) -> usize
{
    #[inline]
    fn idle(&mut self, idle_counter: usize) -> usize {
        self(idle_counter)
    }
}

/// Polled between work units of a streaming loop. Loop ends on first `false`.
pub trait ExitCondition{
    fn keep_running(&mut self) -> bool;
}

impl<F> ExitCondition for F
    where F: FnMut() -> bool
{
    #[inline]
    fn keep_running(&mut self) -> bool {
        self()
    }
}

/// Spin-loop hint only. Lowest latency, burns a core.
#[derive(Copy, Clone, Debug, Default)]
pub struct BusySpin;

impl WaitStrategy for BusySpin{
    #[inline]
    fn idle(&mut self, idle_counter: usize) -> usize {
        spin_loop();
        idle_counter.wrapping_add(1)
    }
}

/// Yields the thread on every idle call.
#[derive(Copy, Clone, Debug, Default)]
pub struct Yield;

impl WaitStrategy for Yield{
    #[inline]
    fn idle(&mut self, idle_counter: usize) -> usize {
        thread::yield_now();
        idle_counter.wrapping_add(1)
    }
}

/// Adapts any [spin] relax strategy: `Relax<spin::relax::Spin>`, `Relax<spin::relax::Yield>`...
pub struct Relax<R: RelaxStrategy>(PhantomData<R>);

impl<R: RelaxStrategy> Relax<R>{
    #[inline]
    pub const fn new() -> Self{
        Self(PhantomData)
    }
}

impl<R: RelaxStrategy> Default for Relax<R>{
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RelaxStrategy> Clone for Relax<R>{
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<R: RelaxStrategy> Copy for Relax<R>{}

impl<R: RelaxStrategy> WaitStrategy for Relax<R>{
    #[inline]
    fn idle(&mut self, idle_counter: usize) -> usize {
        R::relax();
        idle_counter.wrapping_add(1)
    }
}

/// Spins for `spin_limit` idle calls, then yields until `yield_limit`, then parks
/// the thread for `park_duration` at a time.
#[derive(Copy, Clone, Debug)]
pub struct Backoff{
    pub spin_limit : usize,
    pub yield_limit: usize,
    pub park_duration: Duration,
}

impl Default for Backoff{
    fn default() -> Self {
        Self{
            spin_limit : 64,
            yield_limit: 128,
            park_duration: Duration::from_micros(50),
        }
    }
}

impl WaitStrategy for Backoff{
    fn idle(&mut self, idle_counter: usize) -> usize {
        if idle_counter < self.spin_limit {
            spin_loop();
        } else if idle_counter < self.yield_limit {
            thread::yield_now();
        } else {
            park_timeout(self.park_duration);
            return idle_counter;
        }
        idle_counter + 1
    }
}

#[cfg(loom)]
pub(crate) use loom::thread;
#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicPtr, AtomicU8, AtomicU64, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::Arc;

/// Busy-wait hint. Under loom this must hand control back to the scheduler,
/// otherwise the model never leaves the spinning thread.
#[cfg(loom)]
#[inline(always)]
pub(crate) fn spin_loop(){
    loom::thread::yield_now();
}

/// Loom has no timed park.
#[cfg(loom)]
#[inline(always)]
pub(crate) fn park_timeout(_duration: std::time::Duration){
    loom::thread::yield_now();
}


#[cfg(not(loom))]
pub(crate) use std::thread;
#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicPtr, AtomicU8, AtomicU64, Ordering};
#[cfg(not(loom))]
pub(crate) use std::sync::Arc;

#[cfg(not(loom))]
#[inline(always)]
pub(crate) fn spin_loop(){
    std::hint::spin_loop();
}

#[cfg(not(loom))]
#[inline(always)]
pub(crate) fn park_timeout(duration: std::time::Duration){
    std::thread::park_timeout(duration);
}

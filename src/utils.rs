use crate::error::CapacityError;
use crate::sync::{AtomicU64, Ordering};

/// Largest power of 2 accepted as a capacity.
pub const MAX_POW2: usize = 1 << 30;

#[inline(always)]
pub fn bittest_u64<const N: u8>(value: u64) -> bool {
    value & (1 << N) != 0
}

/// 0 and 1 round to 1.
#[inline]
pub fn round_to_power_of_two(value: usize) -> Result<usize, CapacityError> {
    if value > MAX_POW2 {
        return Err(CapacityError::TooLarge { requested: value, limit: MAX_POW2 });
    }
    Ok(value.next_power_of_two())
}

/// `producer - consumer`, in raw index units.
///
/// The consumer index is read on both sides of the producer index read, and the result
/// accepted only if the two agree. Producers may still race ahead after the producer
/// index is read, so the value can be stale-high, but never "negative".
#[inline]
pub fn index_distance(producer_index: &AtomicU64, consumer_index: &AtomicU64) -> u64 {
    let mut after = consumer_index.load(Ordering::Acquire);
    loop {
        let before = after;
        let current_producer_index = producer_index.load(Ordering::Acquire);
        after = consumer_index.load(Ordering::Acquire);
        if before == after {
            return current_producer_index.saturating_sub(after);
        }
    }
}

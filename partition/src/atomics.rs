//! Lock-free read-modify-write helpers for shared lane memory.
//!
//! Counters shared between lanes are *tagged*: the top [`TAG_BITS`] bits of
//! the word hold the low bits of the id of the lane that wrote it last, the
//! remaining bits hold the count. Tagged updates are compare-and-retry loops,
//! so a concurrent writer is never silently overwritten.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Number of high bits reserved for the writer tag.
pub const TAG_BITS: u32 = 5;

/// Bit position of the lowest tag bit.
pub const TAG_SHIFT: u32 = u32::BITS - TAG_BITS;

/// Mask selecting the count bits of a tagged word.
pub const TAG_MASK: u32 = (1 << TAG_SHIFT) - 1;

/// How [`atomic_min`] lowers a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomicMinStrategy {
    /// Hardware `fetch_min`.
    #[default]
    Native,
    /// Compare-and-retry loop, for targets without an atomic min instruction.
    CompareRetry,
}

/// Tag bits identifying `lane`. Lanes 32 apart share a tag.
#[inline]
pub fn lane_tag(lane: usize) -> u32 {
    ((lane as u32) & ((1 << TAG_BITS) - 1)) << TAG_SHIFT
}

/// Count bits of a tagged word.
#[inline]
pub fn tagged_count(word: u32) -> u32 {
    word & TAG_MASK
}

/// Tag bits of a tagged word, shifted down to a lane number.
#[inline]
pub fn tag_of(word: u32) -> u32 {
    word >> TAG_SHIFT
}

/// Applies `combine` to the current value of `cell` until the write commits.
///
/// Returns `(previous, written)`. `combine` may run several times under
/// contention and must be pure.
#[inline]
pub fn compare_and_retry<F>(cell: &AtomicU32, combine: F) -> (u32, u32)
where
    F: Fn(u32) -> u32,
{
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = combine(current);
        // AcqRel: acquire sees earlier writers, release publishes this one.
        match cell.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return (current, next),
            Err(actual) => current = actual,
        }
    }
}

/// Increments the count of a tagged word on behalf of `lane`.
///
/// Returns the count before the increment, which makes the result usable as
/// a unique slot index among concurrent callers.
#[inline]
pub fn tagged_inc(cell: &AtomicU32, lane: usize) -> u32 {
    let tag = lane_tag(lane);
    let (previous, _) = compare_and_retry(cell, |word| {
        tag | (tagged_count(word).wrapping_add(1) & TAG_MASK)
    });
    tagged_count(previous)
}

/// Adds `value` to the count of a tagged word on behalf of `lane`.
#[inline]
pub fn tagged_add(cell: &AtomicU32, value: u32, lane: usize) {
    let tag = lane_tag(lane);
    compare_and_retry(cell, |word| {
        tag | (tagged_count(word).wrapping_add(value) & TAG_MASK)
    });
}

/// Lowers `cell` to `min(current, value)`. Never raises the stored value.
///
/// Returns the value stored before the call; the call lowered the cell iff
/// the returned value is greater than `value`.
#[inline]
pub fn atomic_min(cell: &AtomicU32, value: u32, strategy: AtomicMinStrategy) -> u32 {
    match strategy {
        AtomicMinStrategy::Native => cell.fetch_min(value, Ordering::AcqRel),
        AtomicMinStrategy::CompareRetry => {
            let mut current = cell.load(Ordering::Acquire);
            while current > value {
                match cell.compare_exchange_weak(
                    current,
                    value,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => break,
                    Err(actual) => current = actual,
                }
            }
            current
        }
    }
}

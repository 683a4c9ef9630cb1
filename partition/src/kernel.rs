//! Per-lane routines executed inside an [`ExecutionGroup`](crate::group::ExecutionGroup).
//!
//! Every routine here is called by *all* lanes of a group and executes the
//! same barriers on every lane, including lanes that own no rectangle.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::atomics::{atomic_min, tagged_add, tagged_count, tagged_inc, AtomicMinStrategy};
use crate::group::{Lane, SharedBuffer};
use crate::predicate::ComponentPredicate;
use crate::rect::Rect;

/// Shared memory of one partition launch.
#[derive(Debug)]
pub struct PartitionMemory {
    /// One label per lane.
    pub labels: SharedBuffer,
    /// Number of the last pass that lowered any label, 0 if none did.
    last_lowering_pass: AtomicU32,
    /// Tagged counter of group roots, filled by [`count_roots`].
    roots: AtomicU32,
}

impl PartitionMemory {
    pub fn new(lanes: usize) -> Self {
        Self {
            labels: SharedBuffer::new(lanes),
            last_lowering_pass: AtomicU32::new(0),
            roots: AtomicU32::new(0),
        }
    }

    /// Root count published by [`count_roots`].
    pub fn root_count(&self) -> usize {
        tagged_count(self.roots.load(Ordering::Acquire)) as usize
    }
}

/// Labels every rectangle with the smallest index of its component.
///
/// Lane `tid` owns `rects[tid]`. Each pass, every owning lane compares its
/// rectangle against all others and, for every matching pair, lowers the
/// larger of the two labels to the smaller one with [`atomic_min`]. Passes
/// repeat until one lowers nothing; at that point labels are constant on
/// every component, and since the smallest index of a component can never
/// be lowered, that constant is the component's minimum index.
///
/// Returns the number of passes. `memory.labels` is final once this returns
/// on any lane.
///
/// # Panics
/// Panics on every lane if `rects` has more entries than the group has lanes
/// or `memory` is smaller than the group.
pub fn partition<P>(
    lane: &Lane<'_>,
    rects: &[Rect],
    memory: &PartitionMemory,
    predicate: &P,
    min_strategy: AtomicMinStrategy,
) -> u32
where
    P: ComponentPredicate + ?Sized,
{
    let n = rects.len();
    assert!(
        n <= lane.group_size(),
        "{n} rectangles do not fit a group of {} lanes",
        lane.group_size()
    );
    assert!(
        memory.labels.len() >= lane.group_size(),
        "label buffer holds {} entries, group has {} lanes",
        memory.labels.len(),
        lane.group_size()
    );

    let tid = lane.id();
    let labels = &memory.labels;

    labels.store(tid, tid as u32);
    lane.sync();

    let mut pass = 0u32;
    loop {
        pass += 1;

        if tid < n {
            let own = &rects[tid];
            for (id, other) in rects.iter().enumerate() {
                if id == tid || !predicate.same_component(own, other) {
                    continue;
                }

                let p = labels.load(tid);
                let q = labels.load(id);
                let lowered = if p < q {
                    atomic_min(labels.cell(id), p, min_strategy) > p
                } else if p > q {
                    atomic_min(labels.cell(tid), q, min_strategy) > q
                } else {
                    false
                };

                if lowered {
                    memory
                        .last_lowering_pass
                        .fetch_max(pass, Ordering::AcqRel);
                }
            }
        }

        lane.sync();

        // Monotonic: a lane already in the next pass can only raise it, so
        // every lane reaches the same decision.
        if memory.last_lowering_pass.load(Ordering::Acquire) < pass {
            break;
        }
    }

    pass
}

/// Counts labels that point at themselves among the first `n` lanes.
///
/// Must run after [`partition`] on the same memory. The count is readable
/// through [`PartitionMemory::root_count`] once this returns.
pub fn count_roots(lane: &Lane<'_>, n: usize, memory: &PartitionMemory) {
    let tid = lane.id();
    if tid < n && memory.labels.load(tid) == tid as u32 {
        tagged_add(&memory.roots, 1, tid);
    }
    lane.sync();
}

/// Gathers the indices of the rectangles that pass `keep`.
///
/// Each kept lane reserves a slot with [`tagged_inc`] on `count` and writes
/// its own index there. Slot order depends on scheduling. Once this returns,
/// the first `tagged_count(count)` slots hold the kept indices.
///
/// # Panics
/// Panics on every lane if `rects` or `slots` do not fit the group.
pub fn compact<K>(
    lane: &Lane<'_>,
    rects: &[Rect],
    keep: &K,
    slots: &SharedBuffer,
    count: &AtomicU32,
) where
    K: Fn(&Rect) -> bool + Sync + ?Sized,
{
    assert!(
        rects.len() <= lane.group_size(),
        "{} rectangles do not fit a group of {} lanes",
        rects.len(),
        lane.group_size()
    );
    assert!(
        slots.len() >= rects.len(),
        "slot buffer holds {} entries for {} rectangles",
        slots.len(),
        rects.len()
    );

    let tid = lane.id();
    if tid < rects.len() && keep(&rects[tid]) {
        let slot = tagged_inc(count, tid);
        slots.store(slot as usize, tid as u32);
    }
    lane.sync();
}

//! Host side: launches partition kernels and collects their results.

use std::sync::atomic::{AtomicU32, Ordering};

use common::grid::dispatch_grid;
use log::debug;

use crate::atomics::tagged_count;
use crate::config::PartitionConfig;
use crate::group::{ExecutionGroup, SharedBuffer};
use crate::kernel::{self, PartitionMemory};
use crate::predicate::InSameComponent;
use crate::rect::Rect;

/// Result of one partition launch.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    rects: Vec<Rect>,
    source: Vec<usize>,
    labels: Vec<u32>,
    num_groups: usize,
    passes: u32,
}

impl Partition {
    fn empty() -> Self {
        Self {
            rects: Vec::new(),
            source: Vec::new(),
            labels: Vec::new(),
            num_groups: 0,
            passes: 0,
        }
    }

    /// Rectangles that took part, in label order.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Root index of every rectangle; equal labels mean the same group.
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Index in the caller's input of the `idx`-th partitioned rectangle.
    ///
    /// # Panics
    /// Panics if `idx >= self.len()`.
    pub fn source_index(&self, idx: usize) -> usize {
        self.source[idx]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    /// Comparison passes the kernel needed to converge.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// # Panics
    /// Panics if `idx >= self.len()`.
    pub fn is_root(&self, idx: usize) -> bool {
        self.labels[idx] as usize == idx
    }

    /// Member indices of every group, groups ordered by their root.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let ordinals = self.compact_labels();
        let mut groups = vec![Vec::new(); self.num_groups];
        for (idx, &ordinal) in ordinals.iter().enumerate() {
            groups[ordinal].push(idx);
        }
        groups
    }

    /// Group ordinal `0..num_groups()` of every rectangle, ordinals assigned
    /// in root order.
    pub fn compact_labels(&self) -> Vec<usize> {
        let mut ordinal_of_root = vec![usize::MAX; self.labels.len()];
        let mut next = 0;
        self.labels
            .iter()
            .map(|&root| {
                let slot = &mut ordinal_of_root[root as usize];
                if *slot == usize::MAX {
                    *slot = next;
                    next += 1;
                }
                *slot
            })
            .collect()
    }
}

/// Merges duplicate detections by launching the lane kernel.
#[derive(Debug, Clone)]
pub struct Partitioner {
    config: PartitionConfig,
    predicate: InSameComponent,
}

impl Partitioner {
    /// # Panics
    /// Panics if `config` does not validate.
    pub fn new(config: PartitionConfig) -> Self {
        config.validate();
        Self {
            predicate: InSameComponent::new(config.eps),
            config,
        }
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Partitions `rects` in one execution group.
    ///
    /// # Panics
    /// Panics if `rects` holds more rectangles than `config.lanes`.
    pub fn partition(&self, rects: &[Rect]) -> Partition {
        let source = (0..rects.len()).collect();
        self.launch_partition(rects.to_vec(), source)
    }

    /// Partitions only the rectangles that pass `keep`.
    ///
    /// Runs a compaction launch first; the partition covers the kept
    /// rectangles in whatever order compaction produced, see
    /// [`Partition::source_index`].
    pub fn partition_filtered<K>(&self, rects: &[Rect], keep: K) -> Partition
    where
        K: Fn(&Rect) -> bool + Sync,
    {
        if rects.is_empty() {
            return Partition::empty();
        }

        let group = self.group_for(rects.len());
        let slots = SharedBuffer::new(rects.len());
        let count = AtomicU32::new(0);

        group.launch(|lane| kernel::compact(lane, rects, &keep, &slots, &count));

        let kept = tagged_count(count.into_inner()) as usize;
        let source: Vec<usize> = slots.to_vec()[..kept]
            .iter()
            .map(|&idx| idx as usize)
            .collect();
        let kept_rects = source.iter().map(|&idx| rects[idx]).collect();
        debug!("compaction kept {kept} of {} rectangles", rects.len());

        self.launch_partition(kept_rects, source)
    }

    /// Partitions every batch in its own execution group.
    ///
    /// At most `config.max_concurrent_groups` groups run at once. Results
    /// are in batch order.
    pub fn partition_batch(&self, batches: &[Vec<Rect>]) -> Vec<Partition> {
        dispatch_grid(batches, self.config.max_concurrent_groups, |_, batch| {
            self.partition(batch)
        })
    }

    fn group_for(&self, n: usize) -> ExecutionGroup {
        assert!(
            n <= self.config.lanes,
            "{n} rectangles exceed the group size of {} lanes",
            self.config.lanes
        );
        ExecutionGroup::new(self.config.lanes)
    }

    fn launch_partition(&self, rects: Vec<Rect>, source: Vec<usize>) -> Partition {
        if rects.is_empty() {
            return Partition::empty();
        }

        let n = rects.len();
        let group = self.group_for(n);
        let memory = PartitionMemory::new(group.lanes());
        let passes = AtomicU32::new(0);
        let strategy = self.config.min_strategy;

        group.launch(|lane| {
            let lane_passes = kernel::partition(lane, &rects, &memory, &self.predicate, strategy);
            kernel::count_roots(lane, n, &memory);
            if lane.id() == 0 {
                passes.store(lane_passes, Ordering::Relaxed);
            }
        });

        let mut labels = memory.labels.to_vec();
        labels.truncate(n);
        let num_groups = memory.root_count();
        let passes = passes.into_inner();

        debug!(
            "partitioned {n} rectangles into {num_groups} groups in {passes} passes ({} lanes)",
            group.lanes()
        );

        Partition {
            rects,
            source,
            labels,
            num_groups,
            passes,
        }
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new(PartitionConfig::default())
    }
}

use std::sync::atomic::{AtomicU32, Ordering};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{chain, clustered_rects};
use crate::atomics::{tagged_count, AtomicMinStrategy};
use crate::group::{ExecutionGroup, SharedBuffer};
use crate::kernel::{compact, count_roots, partition, PartitionMemory};
use crate::predicate::{ComponentPredicate, InSameComponent};
use crate::rect::Rect;
use crate::union_find::partition_sequential;

const STRATEGIES: [AtomicMinStrategy; 2] =
    [AtomicMinStrategy::Native, AtomicMinStrategy::CompareRetry];

#[derive(Debug)]
struct KernelRun {
    /// Labels of all lanes, including idle ones.
    lane_labels: Vec<u32>,
    passes: u32,
    roots: usize,
}

impl KernelRun {
    fn labels(&self, n: usize) -> &[u32] {
        &self.lane_labels[..n]
    }
}

fn run_kernel<P>(
    rects: &[Rect],
    lanes: usize,
    predicate: &P,
    strategy: AtomicMinStrategy,
) -> KernelRun
where
    P: ComponentPredicate,
{
    let group = ExecutionGroup::new(lanes);
    let memory = PartitionMemory::new(lanes);
    let passes = AtomicU32::new(0);
    let pass_mismatch = AtomicU32::new(0);

    group.launch(|lane| {
        let lane_passes = partition(lane, rects, &memory, predicate, strategy);
        count_roots(lane, rects.len(), &memory);

        let seen = passes.fetch_max(lane_passes, Ordering::Relaxed);
        if seen != 0 && seen != lane_passes {
            pass_mismatch.fetch_add(1, Ordering::Relaxed);
        }
    });

    assert_eq!(
        pass_mismatch.load(Ordering::Relaxed),
        0,
        "lanes disagreed on the number of passes"
    );

    KernelRun {
        lane_labels: memory.labels.to_vec(),
        passes: passes.into_inner(),
        roots: memory.root_count(),
    }
}

fn distinct(labels: &[u32]) -> usize {
    let mut sorted = labels.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

#[test]
fn two_duplicates_and_one_outlier() {
    let rects = [
        Rect::new(0, 0, 10, 10),
        Rect::new(1, 1, 10, 10),
        Rect::new(100, 100, 10, 10),
    ];
    let predicate = InSameComponent::new(0.2);

    for strategy in STRATEGIES {
        let run = run_kernel(&rects, 8, &predicate, strategy);
        assert_eq!(run.labels(3), &[0, 0, 2], "strategy {strategy:?}");
        assert_eq!(run.roots, 2);
    }
}

#[test]
fn unrelated_rects_stay_singletons() {
    let rects: Vec<Rect> = (0..20)
        .map(|i| Rect::new(i * 50, (i % 3) * 70, 12, 12))
        .collect();
    let predicate = InSameComponent::new(0.2);

    let run = run_kernel(&rects, 32, &predicate, AtomicMinStrategy::Native);

    let expected: Vec<u32> = (0..20).collect();
    assert_eq!(run.labels(20), expected.as_slice());
    assert_eq!(run.roots, 20);
    assert_eq!(run.passes, 1);
}

#[test]
fn chain_is_closed_transitively() {
    let rects = chain(3);
    let predicate = InSameComponent::new(0.25);
    assert!(predicate.same_component(&rects[0], &rects[1]));
    assert!(predicate.same_component(&rects[1], &rects[2]));
    assert!(!predicate.same_component(&rects[0], &rects[2]));

    for strategy in STRATEGIES {
        let run = run_kernel(&rects, 4, &predicate, strategy);
        assert_eq!(run.labels(3), &[0, 0, 0], "strategy {strategy:?}");
        assert_eq!(run.roots, 1);
    }
}

#[test]
fn shuffled_long_chain_converges_to_min_index() {
    let predicate = InSameComponent::new(0.25);

    for seed in 0..5 {
        let mut rects = chain(40);
        rects.shuffle(&mut StdRng::seed_from_u64(seed));

        for strategy in STRATEGIES {
            let run = run_kernel(&rects, 40, &predicate, strategy);
            assert!(
                run.labels(40).iter().all(|&l| l == 0),
                "seed {seed}, strategy {strategy:?}: {:?}",
                run.labels(40)
            );
            assert_eq!(run.roots, 1);
            assert!(run.passes >= 1);
        }
    }
}

#[test]
fn matches_sequential_reference_on_random_sets() {
    let predicate = InSameComponent::new(0.2);

    for seed in 0..12 {
        let rects = clustered_rects(seed, 10 + (seed as usize * 3));
        let expected = partition_sequential(&rects, &predicate);

        for strategy in STRATEGIES {
            let run = run_kernel(&rects, 64, &predicate, strategy);
            assert_eq!(
                run.labels(rects.len()),
                expected.as_slice(),
                "seed {seed}, strategy {strategy:?}"
            );
            assert_eq!(run.roots, distinct(&expected));
        }
    }
}

#[test]
fn every_label_is_the_component_minimum() {
    let predicate = InSameComponent::new(0.3);
    let rects = clustered_rects(99, 48);
    let run = run_kernel(&rects, 48, &predicate, AtomicMinStrategy::CompareRetry);
    let labels = run.labels(48);

    for (idx, &label) in labels.iter().enumerate() {
        assert!(label as usize <= idx);
        assert_eq!(labels[label as usize], label, "label of a root is itself");
    }
}

#[test]
fn rerun_is_idempotent() {
    let predicate = InSameComponent::new(0.2);
    let rects = clustered_rects(7, 30);

    let first = run_kernel(&rects, 32, &predicate, AtomicMinStrategy::Native);
    let second = run_kernel(&rects, 32, &predicate, AtomicMinStrategy::Native);
    assert_eq!(first.labels(30), second.labels(30));
}

#[test]
fn swapped_predicate_arguments_give_same_grouping() {
    let predicate = InSameComponent::new(0.2);
    let swapped = |a: &Rect, b: &Rect| predicate.same_component(b, a);

    for seed in 20..25 {
        let rects = clustered_rects(seed, 24);
        let forward = run_kernel(&rects, 24, &predicate, AtomicMinStrategy::Native);
        let backward = run_kernel(&rects, 24, &swapped, AtomicMinStrategy::Native);
        assert_eq!(forward.labels(24), backward.labels(24), "seed {seed}");
    }
}

#[test]
fn idle_lanes_keep_their_own_label() {
    let rects = [Rect::new(0, 0, 10, 10), Rect::new(1, 0, 10, 10)];
    let predicate = InSameComponent::new(0.2);

    let run = run_kernel(&rects, 16, &predicate, AtomicMinStrategy::Native);

    assert_eq!(run.labels(2), &[0, 0]);
    let idle: Vec<u32> = (2..16).collect();
    assert_eq!(&run.lane_labels[2..], idle.as_slice());
    assert_eq!(run.roots, 1);
}

#[test]
fn empty_input_runs_all_barriers() {
    let predicate = InSameComponent::new(0.2);
    let run = run_kernel(&[], 4, &predicate, AtomicMinStrategy::Native);
    assert_eq!(run.roots, 0);
    assert_eq!(run.passes, 1);
}

#[test]
#[should_panic(expected = "do not fit a group")]
fn too_many_rects_panics_on_every_lane() {
    let rects = chain(5);
    run_kernel(&rects, 4, &InSameComponent::new(0.2), AtomicMinStrategy::Native);
}

#[test]
#[should_panic(expected = "predicate rejected rectangle")]
fn predicate_panic_aborts_the_group() {
    let rects = [Rect::new(0, 0, 10, 10), Rect::new(1, 0, 10, 10)];
    let failing = |a: &Rect, _: &Rect| {
        assert!(a.x != 1, "predicate rejected rectangle at x = {}", a.x);
        true
    };

    // Lane 1 fails after the initial barrier while lanes 0, 2 and 3 wait
    // at the end of the pass.
    run_kernel(&rects, 4, &failing, AtomicMinStrategy::Native);
}

#[test]
fn rects_at_coordinate_limits() {
    let rects = [
        Rect::new(i32::MAX, 0, 1, 1),
        Rect::new(i32::MAX, 0, 1, 1),
        Rect::new(i32::MIN, i32::MIN, 10, 10),
        Rect::new(i32::MIN + 1, i32::MIN, 10, 10),
        Rect::new(i32::MAX - 10, i32::MAX - 10, i32::MAX, i32::MAX),
    ];
    let predicate = InSameComponent::new(0.2);

    for strategy in STRATEGIES {
        let run = run_kernel(&rects, 8, &predicate, strategy);
        assert_eq!(run.labels(5), &[0, 0, 2, 2, 4], "strategy {strategy:?}");
        assert_eq!(run.roots, 3);
    }
}

#[test]
fn compact_gathers_kept_indices() {
    let rects: Vec<Rect> = (0..20).map(|i| Rect::new(i, 0, 10 + i % 2, 10)).collect();
    let group = ExecutionGroup::new(24);
    let slots = SharedBuffer::new(20);
    let count = AtomicU32::new(0);
    let keep = |r: &Rect| r.width == 10;

    group.launch(|lane| compact(lane, &rects, &keep, &slots, &count));

    let kept = tagged_count(count.into_inner()) as usize;
    assert_eq!(kept, 10);

    let mut indices: Vec<u32> = slots.to_vec()[..kept].to_vec();
    indices.sort_unstable();
    let expected: Vec<u32> = (0..20).step_by(2).collect();
    assert_eq!(indices, expected);
}

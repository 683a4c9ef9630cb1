mod kernel_tests;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::rect::Rect;

/// Rectangles scattered around a few cluster centres, so that random sets
/// contain both duplicates and isolated boxes.
pub(crate) fn clustered_rects(seed: u64, count: usize) -> Vec<Rect> {
    let mut rng = StdRng::seed_from_u64(seed);
    let clusters: Vec<(i32, i32)> = (0..rng.random_range(1..6))
        .map(|_| (rng.random_range(0..400), rng.random_range(0..400)))
        .collect();

    (0..count)
        .map(|_| {
            let (cx, cy) = clusters[rng.random_range(0..clusters.len())];
            let size = rng.random_range(16..40);
            Rect::new(
                cx + rng.random_range(-6..=6),
                cy + rng.random_range(-6..=6),
                size + rng.random_range(-2..=2),
                size + rng.random_range(-2..=2),
            )
        })
        .collect()
}

/// Horizontal chain where neighbours match at `eps = 0.25` but boxes two
/// steps apart do not.
pub(crate) fn chain(len: usize) -> Vec<Rect> {
    (0..len as i32).map(|i| Rect::new(i * 2, 0, 10, 10)).collect()
}

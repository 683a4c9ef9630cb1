//! Dispatch of independent work units ("blocks") over the rayon pool.
//!
//! Work is issued in waves of at most `max_in_flight` units. A wave must
//! finish before the next one starts, which bounds how many units hold their
//! resources (threads, scratch memory) at the same time.

use rayon::prelude::*;

/// Runs `f(index, item)` for every item, at most `max_in_flight` at once.
///
/// Results are returned in item order regardless of completion order.
///
/// # Panics
///
/// Panics if `max_in_flight` is 0.
pub fn dispatch_grid<T, R, F>(items: &[T], max_in_flight: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    assert!(max_in_flight > 0, "max_in_flight must be > 0");

    let mut results = Vec::with_capacity(items.len());
    for (wave_idx, wave) in items.chunks(max_in_flight).enumerate() {
        let base = wave_idx * max_in_flight;
        log::trace!("dispatching wave {wave_idx} with {} units", wave.len());

        let wave_results: Vec<R> = wave
            .par_iter()
            .enumerate()
            .map(|(offset, item)| f(base + offset, item))
            .collect();
        results.extend(wave_results);
    }
    results
}

//! Random values within bounds, used by variation and selection logic.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

/// Creates the engine's random source, seeded when reproducible output is wanted.
pub fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// Uniform value in `[min, max]`, both ends inclusive.
///
/// Returns `min` when the range is empty or degenerate, so `random_range(rng, x, x)` is exactly `x`.
pub fn random_range<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if min.partial_cmp(&max) != Some(Ordering::Less) {
        return min;
    }
    rng.gen_range(min..=max).clamp(min, max)
}

/// Uniform index in `[0, len)`. `len` must be non-zero.
pub fn random_index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    debug_assert!(len > 0, "random_index on an empty range");
    rng.gen_range(0..len)
}

//! Bounded random walk for scalar metrics and rare status flips.

use crate::params::MetricSpec;
use rand::seq::SliceRandom;
use rand::Rng;

/// Moves `previous` by a uniform delta in `[-max_delta/2, +max_delta/2]`
/// and clamps the result to `[min, max]`.
pub fn drift<R: Rng + ?Sized>(rng: &mut R, previous: f64, max_delta: f64, min: f64, max: f64) -> f64 {
    let half = max_delta.abs() / 2.0;
    let delta = if half > 0.0 { rng.gen_range(-half..=half) } else { 0.0 };
    clamp(previous + delta, min, max)
}

pub fn drift_metric<R: Rng + ?Sized>(rng: &mut R, previous: f64, spec: &MetricSpec) -> f64 {
    drift(rng, previous, spec.max_delta, spec.min, spec.max)
}

/// With probability `p` returns a uniformly chosen candidate, otherwise `previous`.
pub fn maybe_flip<R: Rng + ?Sized, T: Copy>(rng: &mut R, previous: T, p: f64, candidates: &[T]) -> T {
    if !chance(rng, p) {
        return previous;
    }
    candidates.choose(rng).copied().unwrap_or(previous)
}

/// `gen_bool` that tolerates out-of-range and NaN probabilities.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    if !(p > 0.0) {
        return false;
    }
    if p >= 1.0 {
        return true;
    }
    rng.gen_bool(p)
}

// f64::clamp panics on inverted bounds; a bad config must not take the store down.
fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContainerStatus;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_drift_stays_within_half_magnitude() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1_000 {
            let next = drift(&mut rng, 50.0, 8.0, 0.0, 100.0);
            assert!((46.0..=54.0).contains(&next), "{next} left the ±4 band");
        }
    }

    #[test]
    fn test_drift_clamps_to_domain() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut value = 99.5;
        for _ in 0..10_000 {
            value = drift(&mut rng, value, 8.0, 0.0, 100.0);
            assert!((0.0..=100.0).contains(&value));
        }
        assert_eq!(drift(&mut rng, 250.0, 0.0, 0.0, 100.0), 100.0);
        assert_eq!(drift(&mut rng, -3.0, 0.0, 0.0, 100.0), 0.0);
    }

    #[test]
    fn test_zero_magnitude_is_identity_inside_domain() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(drift(&mut rng, 42.25, 0.0, 0.0, 100.0), 42.25);
    }

    #[test]
    fn test_maybe_flip_branches() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let candidates = [ContainerStatus::Error];
        assert_eq!(maybe_flip(&mut rng, ContainerStatus::Running, 0.0, &candidates), ContainerStatus::Running);
        assert_eq!(maybe_flip(&mut rng, ContainerStatus::Running, 1.0, &candidates), ContainerStatus::Error);
        assert_eq!(maybe_flip(&mut rng, ContainerStatus::Paused, 1.0, &[]), ContainerStatus::Paused);
    }

    #[test]
    fn test_chance_tolerates_bad_probabilities() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(!chance(&mut rng, f64::NAN));
        assert!(!chance(&mut rng, -1.0));
        assert!(chance(&mut rng, 3.0));
    }
}

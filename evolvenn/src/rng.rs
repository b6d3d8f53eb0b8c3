use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// The single random stream of an evolution run.
///
/// Only the driver thread draws from it, so that
/// a run is reproducible from its seed regardless
/// of the order in which evaluations complete.
pub type EvolutionRng = Pcg64;

/// Returns a new run RNG seeded with `seed`.
pub fn seeded(seed: u64) -> EvolutionRng {
    Pcg64::seed_from_u64(seed)
}

/// Bernoulli trials over any `Rng`, using the
/// `f32` probabilities found in configuration.
pub trait Chance {
    /// Returns `true` with probability `chance`.
    /// Values ≤ 0 never succeed, values ≥ 1 always do.
    fn chance(&mut self, chance: f32) -> bool;
}

impl<R: Rng + ?Sized> Chance for R {
    fn chance(&mut self, chance: f32) -> bool {
        self.gen::<f32>() < chance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chance_bounds() {
        let mut rng = seeded(7);
        assert!((0..1000).all(|_| !rng.chance(0.0)));
        assert!((0..1000).all(|_| rng.chance(1.0)));
    }

    #[test]
    fn seeded_streams_repeat() {
        let a: Vec<u32> = seeded(42).sample_iter(rand::distributions::Standard).take(16).collect();
        let b: Vec<u32> = seeded(42).sample_iter(rand::distributions::Standard).take(16).collect();
        assert_eq!(a, b);
    }
}

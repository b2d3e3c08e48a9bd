//! Seeded random number generation for reproducible runs.

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

/// Random number generator fully determined by its seed.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    seed: u64,
    rng: StdRng,
}

impl DeterministicRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The seed this generator was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Next raw `u64`.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Uniform sample from `range`.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.gen_range(range)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Derive an independent generator, e.g. one per simulated thread.
    /// The child seed comes from this generator, so forking is deterministic too.
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = DeterministicRng::new(42);
        let mut b = DeterministicRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.gen_range(0..1000_u64), b.gen_range(0..1000_u64));
        }

        let mut xs: Vec<u32> = (0..50).collect();
        let mut ys = xs.clone();
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_forks_are_deterministic_and_distinct() {
        let mut a = DeterministicRng::new(7);
        let mut b = DeterministicRng::new(7);

        let mut fa = a.fork();
        let mut fb = b.fork();
        assert_eq!(fa.seed(), fb.seed());
        assert_eq!(fa.next_u64(), fb.next_u64());

        let second = a.fork();
        assert_ne!(second.seed(), fa.seed());
    }
}

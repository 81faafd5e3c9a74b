//! Random pick and shuffle, seedable for deterministic tests.

use crate::error::Error;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// The random number generator backing every random decision in the game.
///
/// Wraps a small, fast PCG generator so that tests can seed it and replay
/// exact shuffles and draws.
#[derive(Debug, Clone)]
pub struct GameRng(Pcg64Mcg);

impl GameRng {
    /// Creates a generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self(Pcg64Mcg::from_entropy())
    }

    /// Creates a generator with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self(Pcg64Mcg::seed_from_u64(seed))
    }

    /// Picks a uniformly random element of the slice.
    pub fn pick<T: Copy>(&mut self, items: &[T]) -> Result<T, Error> {
        if items.is_empty() {
            return Err(Error::PileEmpty);
        }
        Ok(items[self.0.gen_range(0..items.len())])
    }

    /// Returns a shuffled copy of the slice.
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut items: Vec<T> = items.to_vec();
        items.shuffle(&mut self.0);
        items
    }
}

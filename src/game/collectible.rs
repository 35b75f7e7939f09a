//! Collectible and spawn-point generation

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::util::time::unix_micros;
use crate::ws::protocol::Collectible;

use super::collision::Arena;

/// Smallest and largest collectible value
pub const MIN_VALUE: u32 = 1;
pub const MAX_VALUE: u32 = 3;

/// Random source for everything placed in the arena
pub struct CollectibleGenerator {
    arena: Arena,
    rng: ChaCha8Rng,
}

impl CollectibleGenerator {
    /// Seeded generator, reproducible across runs
    pub fn seeded(arena: Arena, seed: u64) -> Self {
        Self {
            arena,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from OS entropy
    pub fn from_entropy(arena: Arena) -> Self {
        Self {
            arena,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    /// Random anchor inside the inset region
    pub fn spawn_position(&mut self) -> (i32, i32) {
        let x = self.rng.gen_range(self.arena.spawn_x_range());
        let y = self.rng.gen_range(self.arena.spawn_y_range());
        (x, y)
    }

    /// A brand new collectible
    pub fn generate(&mut self) -> Collectible {
        let (x, y) = self.spawn_position();
        let value = self.rng.gen_range(MIN_VALUE..=MAX_VALUE);
        let tiebreak: u32 = self.rng.gen();

        Collectible {
            id: format!("{:x}-{:08x}", unix_micros(), tiebreak),
            x,
            y,
            value,
        }
    }

    /// Replacement for `previous`, differing in both id and position
    pub fn regenerate(&mut self, previous: &Collectible) -> Collectible {
        loop {
            let next = self.generate();
            if next.id != previous.id && (next.x, next.y) != (previous.x, previous.y) {
                return next;
            }
        }
    }
}

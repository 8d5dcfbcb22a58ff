use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};

/// Good default concrete rng.
pub type GameRng = rand_xorshift::XorShiftRng;

/// Construct a throwaway random number generator seeded by a noise value.
///
/// Good for short-term use in immutable contexts given a varying source of
/// noise like map position coordinates.
pub fn srng(seed: &(impl Hash + ?Sized)) -> GameRng {
    let mut h = crate::FastHasher::default();
    seed.hash(&mut h);
    GameRng::seed_from_u64(h.finish())
}

pub trait RngExt {
    /// Roll a single percentile check against a chance clamped to 0..=100.
    fn percent(&mut self, chance: i32) -> bool;

    fn one_chance_in(&mut self, n: usize) -> bool;
}

impl<T: Rng + ?Sized> RngExt for T {
    fn percent(&mut self, chance: i32) -> bool {
        if chance <= 0 {
            return false;
        }
        if chance >= 100 {
            return true;
        }
        self.gen_range(0..100) < chance
    }

    fn one_chance_in(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        self.gen_range(0..n) == 0
    }
}

//! Shared randomness for topology generation and target selection.
//!
//! Every draw is taken from the operating system's cryptographically strong
//! generator, so runs are never reproducible and the source carries no state
//! that would need locking between worker threads.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// Uniform random source backed by OS entropy.
///
/// The source is stateless, so one instance (or copies of it) can be used
/// from any number of threads at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSource {
    _private: (),
}

impl RandomSource {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Uniformly distributed non-negative 63 bit integer
    pub fn next_i63(&self) -> i64 {
        (OsRng.next_u64() & (u64::MAX >> 1)) as i64
    }

    /// Uniform draw from `0..bound`. `bound` must be positive.
    pub fn gen_index(&self, bound: usize) -> usize {
        assert!(bound > 0, "cannot draw from an empty range");
        OsRng.gen_range(0..bound)
    }

    /// `true` with probability `p` (callers validate `p` is within [0, 1])
    pub fn gen_bool(&self, p: f64) -> bool {
        OsRng.gen_bool(p)
    }

    /// Random permutation of `0..n`
    pub fn permutation(&self, n: usize) -> Vec<usize> {
        let mut ids: Vec<usize> = (0..n).collect();
        ids.shuffle(&mut OsRng);
        ids
    }

    /// Deterministic replay is not supported: any attempt to seed aborts.
    pub fn reseed(&self, seed: u64) -> ! {
        panic!("RandomSource draws from OS entropy and cannot be seeded (got {seed})");
    }
}

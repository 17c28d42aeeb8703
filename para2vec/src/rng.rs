use rand::{Rng, RngCore, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::real;

/// A pseudo-random number stream.
///
/// Each training worker owns one of these; streams are never shared between
/// threads, so two workers never draw correlated negative samples.
#[derive(Clone)]
pub struct RandomStream(XorShiftRng);

impl RandomStream {
    pub fn new(seed: u64) -> Self {
        RandomStream(XorShiftRng::seed_from_u64(seed))
    }

    /// Derive an independent stream, seeded from this one.
    pub fn split(&mut self) -> RandomStream {
        RandomStream::new(self.next())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u64 {
        self.0.next_u64()
    }

    /// Get a uniformly distributed random number in `0.0 .. 1.0`.
    pub fn zero2one(&mut self) -> real {
        self.0.gen::<real>()
    }

    /// Get a uniformly distributed index in `0 .. n`. Panics if `n` is zero.
    pub fn below(&mut self, n: usize) -> usize {
        self.0.gen_range(0..n)
    }

    /// Get a uniformly distributed number in `low .. high`.
    pub fn uniform(&mut self, low: real, high: real) -> real {
        self.0.gen_range(low..high)
    }
}

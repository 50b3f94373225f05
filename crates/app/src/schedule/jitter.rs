//! Random offsets for entries with `randomize` set.

use rand::Rng;

/// Source of whole-minute random offsets.
pub trait Jitter: Send {
    /// A uniformly drawn number of minutes in `0..=max`.
    fn minutes(&mut self, max: u32) -> i64;
}

/// [`Jitter`] backed by a [`rand`] generator.
pub struct RngJitter<R> {
    rng: R,
}

impl<R: Rng + Send> RngJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngJitter<rand::rngs::StdRng> {
    /// Generator seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        use rand::SeedableRng;
        Self::new(rand::rngs::StdRng::from_entropy())
    }
}

impl<R: Rng + Send> Jitter for RngJitter<R> {
    fn minutes(&mut self, max: u32) -> i64 {
        i64::from(self.rng.gen_range(0..=max))
    }
}

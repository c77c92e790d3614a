// crates/ea_core/src/rng.rs
//
// Seedable RNG for scenario draws and Monte Carlo noise.
//
// • The only sources of randomness are the scenario seed (incumbency draws) and the
//   simulation seed; there is no OS entropy anywhere in the engine.
// • The u64 → ChaCha20 32-byte seed mapping is explicit (little-endian bytes in the
//   first 8 positions, the rest zero) so streams are stable across platforms.
// • Independent streams (one per Monte Carlo batch) come from ChaCha's stream id, so
//   batch b draws the same numbers whichever thread runs it.

use rand::distributions::Distribution;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

/// Deterministic RNG over ChaCha20.
#[derive(Debug, Clone)]
pub struct SimRng {
    rng: ChaCha20Rng,
}

impl SimRng {
    /// Construct from a 64-bit seed (stream 0).
    #[inline]
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut seed32 = [0u8; 32];
        seed32[..8].copy_from_slice(&seed.to_le_bytes());
        Self { rng: ChaCha20Rng::from_seed(seed32) }
    }

    /// Construct the `stream`-th independent stream of `seed`.
    #[inline]
    pub fn from_seed_stream(seed: u64, stream: u64) -> Self {
        let mut s = Self::from_seed_u64(seed);
        s.rng.set_stream(stream);
        s
    }

    /// Uniform float in the closed interval `[lo, hi]`. Requires `lo <= hi`.
    #[inline]
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Draw one sample from `dist`.
    #[inline]
    pub fn sample<D: Distribution<f64>>(&mut self, dist: &D) -> f64 {
        dist.sample(&mut self.rng)
    }
}

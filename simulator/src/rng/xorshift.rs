//! xorshift64* random number generator
//!
//! Fast, high-quality PRNG suitable for simulation purposes.
//!
//! # Determinism
//!
//! Same seed → same sequence of random numbers. Every stochastic quantity in
//! a run (demand noise, heat walks, spike onsets and durations) is a pure
//! function of the seed and the call order, which is what makes scenario
//! scores reproducible.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use fleet_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let noise = rng.uniform(-0.15, 0.15);
/// let duration = rng.uniform_int(2, 4); // inclusive bounds
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is coerced to 1 (xorshift requires nonzero state).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    ///
    /// Advances the internal state and returns a random value.
    pub fn next(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        // Convert to [0.0, 1.0) using the top 53 bits
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Generate random f64 in range [low, high)
    ///
    /// Consumes exactly one state advance, including when `low == high`
    /// (the result is then `low`). Call order is part of the determinism
    /// contract, so degenerate ranges still draw.
    ///
    /// # Panics
    /// Panics if low > high
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        assert!(low <= high, "low must not exceed high");

        low + self.next_f64() * (high - low)
    }

    /// Generate random integer in range [low, high], both bounds inclusive
    ///
    /// # Panics
    /// Panics if low > high
    pub fn uniform_int(&mut self, low: i64, high: i64) -> i64 {
        assert!(low <= high, "low must not exceed high");

        let span = (high - low) as u64 + 1;
        low + (self.next() % span) as i64
    }

    /// Get current RNG state (for diagnostics and replay)
    pub fn get_state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    #[should_panic(expected = "low must not exceed high")]
    fn test_uniform_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.uniform(1.0, -1.0);
    }

    #[test]
    fn test_next_f64_in_range() {
        let mut rng = RngManager::new(12345);

        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!(
                val >= 0.0 && val < 1.0,
                "next_f64() produced value {} outside [0.0, 1.0)",
                val
            );
        }
    }

    #[test]
    fn test_uniform_respects_bounds() {
        let mut rng = RngManager::new(777);

        for _ in 0..1000 {
            let val = rng.uniform(-0.15, 0.15);
            assert!(val >= -0.15 && val < 0.15);
        }
    }

    #[test]
    fn test_uniform_degenerate_range_draws() {
        let mut rng = RngManager::new(42);
        let before = rng.get_state();

        assert_eq!(rng.uniform(0.0, 0.0), 0.0);
        assert_ne!(rng.get_state(), before, "degenerate range must still advance state");
    }

    #[test]
    fn test_uniform_int_inclusive() {
        let mut rng = RngManager::new(9);
        let mut seen = [false; 3];

        for _ in 0..200 {
            let val = rng.uniform_int(2, 4);
            assert!((2..=4).contains(&val));
            seen[(val - 2) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s), "all of 2, 3, 4 should appear");
    }

    #[test]
    fn test_deterministic_sequences() {
        let mut rng1 = RngManager::new(99999);
        let mut rng2 = RngManager::new(99999);

        for _ in 0..100 {
            assert_eq!(rng1.uniform(0.0, 10.0), rng2.uniform(0.0, 10.0));
            assert_eq!(rng1.uniform_int(0, 100), rng2.uniform_int(0, 100));
        }
    }
}

//! Deterministic Random Number Generator
//!
//! Lehmer (Park-Miller) linear congruential generator. Given the same seed,
//! produces an identical sequence on all platforms, which is what duel
//! fairness rests on: both clients derive the same rounds from one shared
//! seed without ever exchanging round payloads.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// LCG multiplier (Lehmer / MINSTD).
const LCG_MULTIPLIER: u64 = 16807;

/// LCG modulus, the Mersenne prime 2^31 - 1.
const LCG_MODULUS: u64 = 2_147_483_647;

/// Prime that keys a round's generator off the session seed, so consecutive
/// rounds of one session draw from unrelated points of the sequence.
pub const ROUND_KEY_PRIME: u64 = 7919;

/// Alphabet for lobby codes. Ambiguous glyphs (I, O, 0, 1) are excluded.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a duel lobby code.
pub const CODE_LENGTH: usize = 6;

/// Deterministic PRNG using the Lehmer LCG.
///
/// # Determinism Guarantee
///
/// Given the same seed, this RNG produces the exact same sequence of values
/// on any platform. All arithmetic is integer-only.
///
/// # Example
///
/// ```
/// use trench_trainer::core::rng::SeededRng;
///
/// let mut rng = SeededRng::new(42);
/// assert_eq!(rng.next_u31(), 705894); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// The state is reduced into the valid Lehmer range `[1, 2^31 - 2]`;
    /// a zero residue maps to 1 so the sequence never degenerates.
    pub fn new(seed: u64) -> Self {
        let state = seed % LCG_MODULUS;
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Create the generator for one round of a seeded session.
    ///
    /// Keyed as `seed + round_index * ROUND_KEY_PRIME`: two independent
    /// processes given the same `(seed, round_index)` pair produce
    /// byte-identical draw sequences.
    pub fn for_round(seed: u64, round_index: u32) -> Self {
        Self::new(seed.wrapping_add(round_index as u64 * ROUND_KEY_PRIME))
    }

    /// Create an RNG seeded from OS entropy.
    ///
    /// Unseeded rounds and noise generation route through this so seeded
    /// and unseeded paths share one code path.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }

    /// Advance the generator and return the next value in `[1, 2^31 - 2]`.
    #[inline]
    pub fn next_u31(&mut self) -> u32 {
        self.state = self.state * LCG_MULTIPLIER % LCG_MODULUS;
        self.state as u32
    }

    /// Generate a random index in `[0, n)`.
    ///
    /// Matches `floor(uniform() * n)` of the reference sequence exactly,
    /// computed in integer arithmetic.
    #[inline]
    pub fn next_below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let raw = (self.next_u31() as u64 - 1) * n as u64 / (LCG_MODULUS - 1);
        (raw as usize).min(n - 1)
    }

    /// Generate a random integer in `[min, max]`.
    #[inline]
    pub fn next_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        min + self.next_below((max - min + 1) as usize) as u32
    }

    /// Roll a probability expressed in percent.
    #[inline]
    pub fn chance(&mut self, percent: u32) -> bool {
        (self.next_below(100) as u32) < percent
    }

    /// Select a random element from a slice.
    pub fn pick<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_below(slice.len());
            Some(&slice[idx])
        }
    }

    /// Shuffle a slice in place using Fisher-Yates, top-down.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_below(i + 1);
            slice.swap(i, j);
        }
    }

    /// Return a shuffled copy of a slice.
    pub fn shuffled<T: Clone>(&mut self, slice: &[T]) -> Vec<T> {
        let mut out = slice.to_vec();
        self.shuffle(&mut out);
        out
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> u64 {
        self.state
    }
}

/// Derive the seed for a started duel.
///
/// Hashes a domain separator, the lobby code, and the start timestamp, so a
/// restarted match is never round-identical to a stale join. Both sides
/// receive the derived value through the shared session record; the inputs
/// only have to be unpredictable before start, not secret after.
pub fn derive_duel_seed(code: &str, started_at_ms: u64) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"TRENCH_DUEL_SEED_V1");
    hasher.update(code.as_bytes());
    hasher.update(started_at_ms.to_le_bytes());

    let hash = hasher.finalize();

    // First 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().expect("hash is 32 bytes"))
}

/// Generate a fresh lobby code from entropy.
pub fn lobby_code() -> String {
    let mut rng = SeededRng::from_entropy();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.next_below(CODE_ALPHABET.len())] as char)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

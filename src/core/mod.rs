//! Deterministic primitives.
//!
//! Everything duel fairness depends on lives here: the seeded generator and
//! the seed/code derivation helpers. No system time, no floats.

pub mod rng;

pub use rng::{derive_duel_seed, lobby_code, SeededRng};

//! Rating engines.
//!
//! Practice is rated on an absolute curve (no opponent), duels on an
//! Elo-style relative ladder. Both are pure functions over sanitized
//! inputs; persistence lives in `storage`.

pub mod duel;
pub mod practice;

pub use duel::{DuelTier, MatchOutcome};
pub use practice::{PracticeTier, SessionSummary};

//! Elo-style duel rating.
//!
//! Standard logistic expectation with a two-step K factor: new accounts
//! move fast, established ones settle. Each side is updated independently
//! with its own K, so a provisional player can swing harder than the
//! veteran they beat.

use serde::{Deserialize, Serialize};

/// Rating every player starts from.
pub const BASE_RATING: u32 = 1_000;

/// Hard floor; no losing streak goes below this.
pub const RATING_FLOOR: u32 = 100;

/// Matches before the K factor settles.
pub const PROVISIONAL_MATCHES: u32 = 30;

const K_PROVISIONAL: f64 = 32.0;
const K_ESTABLISHED: f64 = 20.0;

/// Result of a duel from one side's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

impl MatchOutcome {
    /// Actual score used in the Elo update.
    pub fn actual_score(&self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Loss => 0.0,
            Self::Draw => 0.5,
        }
    }

    /// The same match from the other chair.
    pub fn reversed(&self) -> Self {
        match self {
            Self::Win => Self::Loss,
            Self::Loss => Self::Win,
            Self::Draw => Self::Draw,
        }
    }
}

/// Expected score for `mine` against `opponent`.
pub fn expected_score(mine: u32, opponent: u32) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent as f64 - mine as f64) / 400.0))
}

/// K factor for a player with `matches_played` recorded matches.
pub fn k_factor(matches_played: u32) -> f64 {
    if matches_played < PROVISIONAL_MATCHES {
        K_PROVISIONAL
    } else {
        K_ESTABLISHED
    }
}

/// One side's new rating after a recorded match.
pub fn updated_rating(
    current: u32,
    opponent: u32,
    outcome: MatchOutcome,
    matches_played: u32,
) -> u32 {
    let expected = expected_score(current, opponent);
    let delta = k_factor(matches_played) * (outcome.actual_score() - expected);
    let next = (current as f64 + delta).round();
    (next.max(RATING_FLOOR as f64)) as u32
}

/// Duel ladder tiers, by rating threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl DuelTier {
    /// Tier for a rating.
    pub fn from_rating(rating: u32) -> Self {
        match rating {
            r if r >= 1_500 => Self::Diamond,
            r if r >= 1_300 => Self::Platinum,
            r if r >= 1_100 => Self::Gold,
            r if r >= 900 => Self::Silver,
            _ => Self::Bronze,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_even_match_win_moves_k_over_two() {
        // Equal ratings, provisional K: winner +16, loser -16.
        let winner = updated_rating(BASE_RATING, BASE_RATING, MatchOutcome::Win, 0);
        let loser = updated_rating(BASE_RATING, BASE_RATING, MatchOutcome::Loss, 0);
        assert_eq!(winner, BASE_RATING + 16);
        assert_eq!(loser, BASE_RATING - 16);
    }

    #[test]
    fn test_draw_between_equals_changes_nothing() {
        let next = updated_rating(BASE_RATING, BASE_RATING, MatchOutcome::Draw, 0);
        assert_eq!(next, BASE_RATING);
    }

    #[test]
    fn test_draw_favors_the_underdog() {
        let underdog = updated_rating(1_000, 1_400, MatchOutcome::Draw, 50);
        let favorite = updated_rating(1_400, 1_000, MatchOutcome::Draw, 50);
        assert!(underdog > 1_000);
        assert!(favorite < 1_400);
    }

    #[test]
    fn test_upset_pays_more_than_expected_win() {
        let upset_gain = updated_rating(1_000, 1_400, MatchOutcome::Win, 50) - 1_000;
        let routine_gain = updated_rating(1_400, 1_000, MatchOutcome::Win, 50) - 1_400;
        assert!(upset_gain > routine_gain);
    }

    #[test]
    fn test_k_settles_after_provisional_window() {
        assert_eq!(k_factor(0), K_PROVISIONAL);
        assert_eq!(k_factor(PROVISIONAL_MATCHES - 1), K_PROVISIONAL);
        assert_eq!(k_factor(PROVISIONAL_MATCHES), K_ESTABLISHED);

        let provisional = updated_rating(BASE_RATING, BASE_RATING, MatchOutcome::Win, 0);
        let established = updated_rating(BASE_RATING, BASE_RATING, MatchOutcome::Win, 60);
        assert!(provisional - BASE_RATING > established - BASE_RATING);
    }

    #[test]
    fn test_floor_holds_under_repeated_losses() {
        let mut rating = RATING_FLOOR + 10;
        for _ in 0..20 {
            rating = updated_rating(rating, 2_000, MatchOutcome::Loss, 100);
        }
        assert_eq!(rating, RATING_FLOOR);
    }

    #[test]
    fn test_expected_score_midpoint_and_symmetry() {
        assert!((expected_score(1_200, 1_200) - 0.5).abs() < 1e-12);
        let e1 = expected_score(1_300, 1_000);
        let e2 = expected_score(1_000, 1_300);
        assert!((e1 + e2 - 1.0).abs() < 1e-12);
        assert!(e1 > 0.5);
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(DuelTier::from_rating(RATING_FLOOR), DuelTier::Bronze);
        assert_eq!(DuelTier::from_rating(899), DuelTier::Bronze);
        assert_eq!(DuelTier::from_rating(900), DuelTier::Silver);
        assert_eq!(DuelTier::from_rating(1_100), DuelTier::Gold);
        assert_eq!(DuelTier::from_rating(1_300), DuelTier::Platinum);
        assert_eq!(DuelTier::from_rating(1_500), DuelTier::Diamond);
    }

    proptest! {
        /// With equal K, the two sides' deltas carry opposite signs and
        /// matching magnitude up to rounding.
        #[test]
        fn prop_updates_mirror_with_equal_k(
            a in 200u32..2_000,
            b in 200u32..2_000,
            win in proptest::bool::ANY,
        ) {
            let outcome = if win { MatchOutcome::Win } else { MatchOutcome::Loss };
            let a_next = updated_rating(a, b, outcome, 100);
            let b_next = updated_rating(b, a, outcome.reversed(), 100);
            let a_delta = a_next as i64 - a as i64;
            let b_delta = b_next as i64 - b as i64;
            prop_assert!(a_delta.signum() * b_delta.signum() <= 0);
            prop_assert!((a_delta + b_delta).abs() <= 1);
        }

        #[test]
        fn prop_rating_never_breaks_floor(
            current in RATING_FLOOR..3_000u32,
            opponent in RATING_FLOOR..3_000u32,
            matches in 0u32..200,
        ) {
            for outcome in [MatchOutcome::Win, MatchOutcome::Loss, MatchOutcome::Draw] {
                prop_assert!(updated_rating(current, opponent, outcome, matches) >= RATING_FLOOR);
            }
        }
    }
}

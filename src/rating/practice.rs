//! Absolute practice rating.
//!
//! A solo session is scored against a fixed curve on a 0-1000 scale, then
//! folded into the player's rating with exponential smoothing. No opponent
//! is involved, so the score is comparable across players and sessions.

use serde::{Deserialize, Serialize};

use crate::game::session::SessionStats;

/// Top of the session-score scale.
pub const SCORE_MAX: u32 = 1_000;

/// Hit count that earns full volume credit.
const FULL_VOLUME_HITS: f64 = 16.0;

/// Reaction time worth zero speed credit. The 1400ms midpoint of this
/// scale is an ordinary human reaction on a busy board.
const SPEED_CEILING_MS: f64 = 2_800.0;

/// Smoothing weight kept from the current rating.
const SMOOTHING_KEEP: f64 = 0.85;

/// Component weights: volume, speed, accuracy, consistency, completion.
const W_VOLUME: f64 = 0.62;
const W_SPEED: f64 = 0.18;
const W_ACCURACY: f64 = 0.10;
const W_CONSISTENCY: f64 = 0.06;
const W_COMPLETION: f64 = 0.04;

/// What a finished practice session reports for rating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Correct selections.
    pub hits: u32,
    /// Wrong selections and timeouts.
    pub misses: u32,
    /// Penalties (reserved, counted against accuracy).
    pub penalties: u32,
    /// Rounds attempted.
    pub rounds: u32,
    /// Mean reaction time over hits, ms. Zero when no hit landed.
    pub avg_rt_ms: f64,
    /// Fastest hit, ms. Zero when no hit landed.
    pub best_rt_ms: f64,
}

impl SessionSummary {
    /// Summarize finished session counters.
    pub fn from_stats(stats: &SessionStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            penalties: stats.penalties,
            rounds: stats.hits + stats.misses + stats.penalties,
            avg_rt_ms: stats.avg_reaction_ms().unwrap_or(0) as f64,
            best_rt_ms: stats.best_time_ms.unwrap_or(0) as f64,
        }
    }

    /// Clamp hostile or garbage inputs to values every component treats as
    /// "no contribution". Rating never errors on bad telemetry.
    fn sanitized(mut self) -> Self {
        if !self.avg_rt_ms.is_finite() || self.avg_rt_ms < 0.0 {
            self.avg_rt_ms = 0.0;
        }
        if !self.best_rt_ms.is_finite() || self.best_rt_ms < 0.0 {
            self.best_rt_ms = 0.0;
        }
        self
    }
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Score a session on the 0-1000 curve.
pub fn session_score(summary: SessionSummary) -> u32 {
    let s = summary.sanitized();

    let volume = clamp01(s.hits as f64 / FULL_VOLUME_HITS);

    let speed = if s.avg_rt_ms > 0.0 {
        clamp01((SPEED_CEILING_MS - s.avg_rt_ms) / SPEED_CEILING_MS)
    } else {
        0.0
    };

    let resolved = s.hits + s.misses + s.penalties;
    let accuracy = if resolved > 0 {
        s.hits as f64 / resolved as f64
    } else {
        0.0
    };

    // How tightly reactions cluster around the best one.
    let consistency = if s.avg_rt_ms > 0.0 && s.best_rt_ms > 0.0 && s.best_rt_ms <= s.avg_rt_ms {
        clamp01(1.0 - (s.avg_rt_ms - s.best_rt_ms) / s.avg_rt_ms)
    } else {
        0.0
    };

    let completion = if s.rounds > 0 {
        clamp01(s.hits as f64 / s.rounds as f64)
    } else {
        0.0
    };

    let blend = W_VOLUME * volume
        + W_SPEED * speed
        + W_ACCURACY * accuracy
        + W_CONSISTENCY * consistency
        + W_COMPLETION * completion;

    (blend * SCORE_MAX as f64).round() as u32
}

/// Fold a session score into the current rating.
///
/// An unranked player (rating 0) adopts the session score outright; an
/// established rating moves 15% of the way toward it.
pub fn updated_rating(current: u32, score: u32) -> u32 {
    if current == 0 {
        score
    } else {
        (current as f64 * SMOOTHING_KEEP + score as f64 * (1.0 - SMOOTHING_KEEP)).round() as u32
    }
}

/// Practice ladder tiers, by rating threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeTier {
    Unranked,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl PracticeTier {
    /// Tier for a rating.
    pub fn from_rating(rating: u32) -> Self {
        match rating {
            0 => Self::Unranked,
            r if r >= 850 => Self::Diamond,
            r if r >= 700 => Self::Platinum,
            r if r >= 550 => Self::Gold,
            r if r >= 400 => Self::Silver,
            _ => Self::Bronze,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unranked => "Unranked",
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
    fn test_solid_session_rates_well_from_unranked() {
        // 8/10 at 650ms average with a 400ms best.
        let summary = SessionSummary {
            hits: 8,
            misses: 2,
            penalties: 0,
            rounds: 10,
            avg_rt_ms: 650.0,
            best_rt_ms: 400.0,
        };
        let score = session_score(summary);
        assert!(score > 0);
        assert!((590..=605).contains(&score), "score was {score}");

        let rating = updated_rating(0, score);
        assert_eq!(rating, score);
        assert!(PracticeTier::from_rating(rating) >= PracticeTier::Bronze);
        assert_eq!(PracticeTier::from_rating(rating), PracticeTier::Gold);
    }

    #[test]
    fn test_empty_session_scores_zero() {
        assert_eq!(session_score(SessionSummary::default()), 0);
    }

    #[test]
    fn test_garbage_telemetry_degrades_not_errors() {
        let summary = SessionSummary {
            hits: 5,
            misses: 0,
            penalties: 0,
            rounds: 5,
            avg_rt_ms: f64::NAN,
            best_rt_ms: -250.0,
        };
        let score = session_score(summary);
        // Speed and consistency contribute nothing; the rest still count.
        let clean = SessionSummary {
            avg_rt_ms: 0.0,
            best_rt_ms: 0.0,
            ..summary
        };
        assert_eq!(score, session_score(clean));
        assert!(score > 0);
    }

    #[test]
    fn test_smoothing_moves_toward_score() {
        assert_eq!(updated_rating(600, 600), 600);
        // 0.85 * 600 + 0.15 * 1000 = 660
        assert_eq!(updated_rating(600, 1_000), 660);
        // 0.85 * 600 + 0.15 * 0 = 510
        assert_eq!(updated_rating(600, 0), 510);
        // Unranked adopts outright.
        assert_eq!(updated_rating(0, 537), 537);
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(PracticeTier::from_rating(0), PracticeTier::Unranked);
        assert_eq!(PracticeTier::from_rating(1), PracticeTier::Bronze);
        assert_eq!(PracticeTier::from_rating(399), PracticeTier::Bronze);
        assert_eq!(PracticeTier::from_rating(400), PracticeTier::Silver);
        assert_eq!(PracticeTier::from_rating(550), PracticeTier::Gold);
        assert_eq!(PracticeTier::from_rating(700), PracticeTier::Platinum);
        assert_eq!(PracticeTier::from_rating(850), PracticeTier::Diamond);
    }

    #[test]
    fn test_from_stats_counts_rounds() {
        let mut stats = SessionStats::default();
        stats.hits = 3;
        stats.misses = 1;
        stats.reaction_times_ms = vec![500, 600, 700];
        stats.best_time_ms = Some(500);
        let summary = SessionSummary::from_stats(&stats);
        assert_eq!(summary.rounds, 4);
        assert_eq!(summary.avg_rt_ms, 600.0);
        assert_eq!(summary.best_rt_ms, 500.0);
    }

    proptest! {
        #[test]
        fn prop_score_stays_on_scale(
            hits in 0u32..200,
            misses in 0u32..200,
            penalties in 0u32..50,
            rounds in 0u32..200,
            avg in proptest::num::f64::ANY,
            best in proptest::num::f64::ANY,
        ) {
            let score = session_score(SessionSummary {
                hits, misses, penalties, rounds,
                avg_rt_ms: avg,
                best_rt_ms: best,
            });
            prop_assert!(score <= SCORE_MAX);
        }

        #[test]
        fn prop_rating_never_exceeds_scale(current in 0u32..=1_000, score in 0u32..=1_000) {
            let next = updated_rating(current, score);
            prop_assert!(next <= SCORE_MAX);
        }
    }
}

//! Player persistence boundary.
//!
//! One record per player (ratings) plus an append-only match history.
//! Backed by in-memory maps behind async locks; updates are
//! read-then-upsert, best effort. Anything durable with per-player rows
//! can replace this behind the same surface.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::rating::duel::{self, DuelTier, MatchOutcome, BASE_RATING};
use crate::rating::practice::{self, PracticeTier, SessionSummary};

/// Practice-side rating state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeRating {
    /// Current rating (0 = unranked).
    pub rating: u32,
    /// Highest rating ever held.
    pub peak: u32,
    /// Rated sessions recorded.
    pub sessions: u32,
}

/// Duel-side rating state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelRating {
    /// Current Elo rating.
    pub rating: u32,
    /// Highest rating ever held.
    pub peak: u32,
    /// Recorded matches, drives the K factor.
    pub matches_played: u32,
}

impl Default for DuelRating {
    fn default() -> Self {
        Self {
            rating: BASE_RATING,
            peak: BASE_RATING,
            matches_played: 0,
        }
    }
}

/// One row per player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Practice ladder state.
    pub practice: PracticeRating,
    /// Duel ladder state.
    pub duel: DuelRating,
}

impl PlayerRecord {
    /// Practice tier for the current rating.
    pub fn practice_tier(&self) -> PracticeTier {
        PracticeTier::from_rating(self.practice.rating)
    }

    /// Duel tier for the current rating.
    pub fn duel_tier(&self) -> DuelTier {
        DuelTier::from_rating(self.duel.rating)
    }
}

/// Which ladder a history entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Practice,
    Duel,
}

/// How a recorded game ended, from the row owner's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// Practice session completed.
    Completed,
    Win,
    Loss,
    Draw,
    /// Opponent vanished mid-duel. Not a win, not rated.
    Abandoned,
}

impl From<MatchOutcome> for GameOutcome {
    fn from(outcome: MatchOutcome) -> Self {
        match outcome {
            MatchOutcome::Win => Self::Win,
            MatchOutcome::Loss => Self::Loss,
            MatchOutcome::Draw => Self::Draw,
        }
    }
}

/// Append-only history row, written once at completion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row owner.
    pub player: Uuid,
    /// Ladder.
    pub mode: GameMode,
    /// Result.
    pub outcome: GameOutcome,
    /// Owner's final score.
    pub score: u32,
    /// Opponent's final score (duels only).
    pub opponent_score: Option<u32>,
    /// Rounds played.
    pub rounds: u32,
    /// Accuracy percentage.
    pub accuracy_pct: u32,
    /// Fastest hit.
    pub best_time_ms: Option<u64>,
    /// Longest streak.
    pub best_streak: u32,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

/// The result of folding a session or match into a player's record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    /// Rating before.
    pub previous: u32,
    /// Rating after.
    pub current: u32,
    /// Peak after.
    pub peak: u32,
}

/// In-memory player store.
pub struct PlayerStore {
    records: RwLock<BTreeMap<Uuid, PlayerRecord>>,
    history: RwLock<Vec<HistoryEntry>>,
}

impl PlayerStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// A player's record, defaults for the unseen.
    pub async fn record(&self, player: Uuid) -> PlayerRecord {
        self.records
            .read()
            .await
            .get(&player)
            .copied()
            .unwrap_or_default()
    }

    /// Fold a finished practice session into the player's rating.
    pub async fn record_practice_session(
        &self,
        player: Uuid,
        summary: SessionSummary,
    ) -> (RatingChange, u32) {
        let score = practice::session_score(summary);
        let mut records = self.records.write().await;
        let record = records.entry(player).or_default();

        let previous = record.practice.rating;
        record.practice.rating = practice::updated_rating(previous, score);
        record.practice.peak = record.practice.peak.max(record.practice.rating);
        record.practice.sessions += 1;

        (
            RatingChange {
                previous,
                current: record.practice.rating,
                peak: record.practice.peak,
            },
            score,
        )
    }

    /// Fold a finished duel into the player's Elo rating.
    pub async fn record_duel_match(
        &self,
        player: Uuid,
        opponent_rating: u32,
        outcome: MatchOutcome,
    ) -> RatingChange {
        let mut records = self.records.write().await;
        let record = records.entry(player).or_default();

        let previous = record.duel.rating;
        record.duel.rating = duel::updated_rating(
            previous,
            opponent_rating,
            outcome,
            record.duel.matches_played,
        );
        record.duel.matches_played += 1;
        record.duel.peak = record.duel.peak.max(record.duel.rating);

        RatingChange {
            previous,
            current: record.duel.rating,
            peak: record.duel.peak,
        }
    }

    /// Append a history row.
    pub async fn append_history(&self, entry: HistoryEntry) {
        self.history.write().await.push(entry);
    }

    /// A player's history, newest first.
    pub async fn history_of(&self, player: Uuid) -> Vec<HistoryEntry> {
        let history = self.history.read().await;
        let mut rows: Vec<HistoryEntry> =
            history.iter().filter(|e| e.player == player).cloned().collect();
        rows.reverse();
        rows
    }
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_summary() -> SessionSummary {
        SessionSummary {
            hits: 8,
            misses: 2,
            penalties: 0,
            rounds: 10,
            avg_rt_ms: 650.0,
            best_rt_ms: 400.0,
        }
    }

    #[tokio::test]
    async fn test_unseen_player_has_defaults() {
        let store = PlayerStore::new();
        let record = store.record(Uuid::new_v4()).await;
        assert_eq!(record.practice.rating, 0);
        assert_eq!(record.practice_tier(), PracticeTier::Unranked);
        assert_eq!(record.duel.rating, BASE_RATING);
        assert_eq!(record.duel_tier(), DuelTier::Silver);
    }

    #[tokio::test]
    async fn test_practice_session_adopts_then_smooths() {
        let store = PlayerStore::new();
        let player = Uuid::new_v4();

        let (first, score) = store.record_practice_session(player, solid_summary()).await;
        assert_eq!(first.previous, 0);
        assert_eq!(first.current, score);
        assert!(score > 0);

        // A blank session drags the rating down but not to zero.
        let (second, _) = store
            .record_practice_session(player, SessionSummary::default())
            .await;
        assert!(second.current < second.previous);
        assert!(second.current > 0);

        let record = store.record(player).await;
        assert_eq!(record.practice.sessions, 2);
        // Peak keeps the high-water mark.
        assert_eq!(record.practice.peak, first.current);
    }

    #[tokio::test]
    async fn test_duel_match_moves_rating_and_k() {
        let store = PlayerStore::new();
        let player = Uuid::new_v4();

        let change = store
            .record_duel_match(player, BASE_RATING, MatchOutcome::Win)
            .await;
        assert_eq!(change.previous, BASE_RATING);
        assert_eq!(change.current, BASE_RATING + 16);
        assert_eq!(change.peak, BASE_RATING + 16);

        let record = store.record(player).await;
        assert_eq!(record.duel.matches_played, 1);

        // Losses move the rating but never the peak.
        let change = store
            .record_duel_match(player, BASE_RATING, MatchOutcome::Loss)
            .await;
        assert!(change.current < change.previous);
        assert_eq!(change.peak, BASE_RATING + 16);
    }

    #[tokio::test]
    async fn test_history_is_append_only_per_player() {
        let store = PlayerStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        for (player, score) in [(a, 3), (b, 9), (a, 5)] {
            store
                .append_history(HistoryEntry {
                    player,
                    mode: GameMode::Practice,
                    outcome: GameOutcome::Completed,
                    score,
                    opponent_score: None,
                    rounds: 10,
                    accuracy_pct: 80,
                    best_time_ms: Some(420),
                    best_streak: 4,
                    created_at: Utc::now(),
                })
                .await;
        }

        let rows = store.history_of(a).await;
        assert_eq!(rows.len(), 2);
        // Newest first.
        assert_eq!(rows[0].score, 5);
        assert_eq!(rows[1].score, 3);
    }
}

//! Duel record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a duel record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    /// Host alone, guest slot open.
    Waiting,
    /// Both seats filled, host has not started.
    Ready,
    /// Started; both sides run the fixed 3-2-1 countdown independently.
    Countdown,
    /// Rounds in progress.
    Playing,
    /// Result frozen.
    Finished,
}

/// Match length, in rounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BestOf {
    Five,
    Ten,
    Twenty,
}

impl BestOf {
    /// Number of rounds.
    pub fn rounds(&self) -> u32 {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::Twenty => 20,
        }
    }

    /// Parse a requested length; anything off-menu falls back to ten.
    pub fn from_rounds(rounds: u32) -> Self {
        match rounds {
            5 => Self::Five,
            20 => Self::Twenty,
            _ => Self::Ten,
        }
    }
}

/// Which seat a player holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelRole {
    Host,
    Guest,
}

/// One side's published score snapshot. Last write wins; each side only
/// ever writes its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Running score.
    pub score: u32,
    /// Current streak.
    pub streak: u32,
    /// Fastest hit so far.
    pub best_time_ms: Option<u64>,
    /// Most recent reaction time.
    pub last_time_ms: Option<u64>,
    /// Round the side is currently on.
    pub round_index: u32,
}

/// External escrow reference. Funding happens elsewhere; the duel only
/// refuses to start until the flag flips.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    /// Opaque escrow id from the external service.
    pub escrow_ref: String,
    /// Set once the escrow reports both sides funded.
    pub funded: bool,
}

/// The shared duel record, keyed by its 6-character code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuelSession {
    /// Join code.
    pub code: String,
    /// Host seat.
    pub host_id: Uuid,
    /// Host display name.
    pub host_name: String,
    /// Guest seat, empty while Waiting.
    pub guest_id: Option<Uuid>,
    /// Guest display name.
    pub guest_name: Option<String>,
    /// Lifecycle status.
    pub status: DuelStatus,
    /// Round seed both sides generate from. Reassigned at start.
    pub seed: u64,
    /// Match length.
    pub best_of: BestOf,
    /// Listed in the public lobby browser.
    pub public: bool,
    /// Optional external wager.
    pub wager: Option<Wager>,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time, for idle garbage collection.
    pub updated_at: DateTime<Utc>,
    /// Host's latest snapshot.
    pub host_stats: PlayerStats,
    /// Guest's latest snapshot.
    pub guest_stats: PlayerStats,
}

impl DuelSession {
    /// Fresh Waiting record.
    pub fn new(
        code: String,
        host_id: Uuid,
        host_name: String,
        best_of: BestOf,
        public: bool,
        seed: u64,
        escrow_ref: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            host_id,
            host_name,
            guest_id: None,
            guest_name: None,
            status: DuelStatus::Waiting,
            seed,
            best_of,
            public,
            wager: escrow_ref.map(|escrow_ref| Wager {
                escrow_ref,
                funded: false,
            }),
            created_at: now,
            updated_at: now,
            host_stats: PlayerStats::default(),
            guest_stats: PlayerStats::default(),
        }
    }

    /// Seat held by `player`, if any.
    pub fn role_of(&self, player: Uuid) -> Option<DuelRole> {
        if player == self.host_id {
            Some(DuelRole::Host)
        } else if self.guest_id == Some(player) {
            Some(DuelRole::Guest)
        } else {
            None
        }
    }

    /// Snapshot for a seat.
    pub fn stats_of(&self, role: DuelRole) -> &PlayerStats {
        match role {
            DuelRole::Host => &self.host_stats,
            DuelRole::Guest => &self.guest_stats,
        }
    }

    /// Snapshot for the opposite seat.
    pub fn opponent_stats(&self, role: DuelRole) -> &PlayerStats {
        match role {
            DuelRole::Host => &self.guest_stats,
            DuelRole::Guest => &self.host_stats,
        }
    }

    /// Open for a guest to claim?
    pub fn is_joinable(&self) -> bool {
        self.status == DuelStatus::Waiting && self.guest_id.is_none()
    }

    /// Does an attached wager block starting?
    pub fn wager_blocks_start(&self) -> bool {
        self.wager.as_ref().map(|w| !w.funded).unwrap_or(false)
    }
}

/// Reduced record for the public lobby browser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuelSummary {
    /// Join code.
    pub code: String,
    /// Host display name.
    pub host_name: String,
    /// Match length.
    pub best_of: BestOf,
    /// Whether a wager is attached.
    pub wagered: bool,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&DuelSession> for DuelSummary {
    fn from(session: &DuelSession) -> Self {
        Self {
            code: session.code.clone(),
            host_name: session.host_name.clone(),
            best_of: session.best_of,
            wagered: session.wager.is_some(),
            created_at: session.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DuelSession {
        DuelSession::new(
            "AB23CD".into(),
            Uuid::new_v4(),
            "host".into(),
            BestOf::Ten,
            true,
            1,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_roles_and_joinability() {
        let mut session = record();
        assert!(session.is_joinable());
        assert_eq!(session.role_of(session.host_id), Some(DuelRole::Host));
        assert_eq!(session.role_of(Uuid::new_v4()), None);

        let guest = Uuid::new_v4();
        session.guest_id = Some(guest);
        session.status = DuelStatus::Ready;
        assert!(!session.is_joinable());
        assert_eq!(session.role_of(guest), Some(DuelRole::Guest));
    }

    #[test]
    fn test_best_of_menu() {
        assert_eq!(BestOf::from_rounds(5), BestOf::Five);
        assert_eq!(BestOf::from_rounds(20), BestOf::Twenty);
        assert_eq!(BestOf::from_rounds(10), BestOf::Ten);
        // Off-menu values fall back.
        assert_eq!(BestOf::from_rounds(7), BestOf::Ten);
        assert_eq!(BestOf::Five.rounds(), 5);
    }

    #[test]
    fn test_wager_gates_start_until_funded() {
        let mut session = record();
        assert!(!session.wager_blocks_start());
        session.wager = Some(Wager {
            escrow_ref: "esc-1".into(),
            funded: false,
        });
        assert!(session.wager_blocks_start());
        session.wager.as_mut().unwrap().funded = true;
        assert!(!session.wager_blocks_start());
    }
}

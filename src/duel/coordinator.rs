//! Duel lifecycle coordination.
//!
//! Owns the store and enforces who may do what when: hosts create and
//! start, guests claim the open slot, each seat publishes only its own
//! snapshot, and either seat may call the finish. All decisions are made
//! from the record under the store lock, never from connection state.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::{derive_duel_seed, lobby_code};
use crate::rating::duel::MatchOutcome;

use super::session::{BestOf, DuelRole, DuelSession, DuelStatus, DuelSummary, PlayerStats};
use super::store::MemoryDuelStore;
use super::DuelError;

/// Attempts at a fresh code before giving up. Collisions on a 32^6 space
/// are already vanishingly rare at any plausible lobby count.
const CODE_RETRY_LIMIT: usize = 16;

/// Countdown both sides observe before Playing.
pub const COUNTDOWN_MS: u64 = 3_000;

/// Waiting lobbies and spent Finished records idle longer than this are
/// garbage-collected.
pub const IDLE_LOBBY_MINUTES: i64 = 15;

/// What happened when a player left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaveEffect {
    /// Host walked; the record is gone and the code is dead.
    Deleted,
    /// Guest walked; the lobby reverted to Waiting under the same code.
    Reverted,
    /// Record already Finished; nothing to unwind.
    None,
}

/// A frozen result, resolved identically for both sides.
#[derive(Clone, Debug, PartialEq)]
pub struct FinishedDuel {
    /// The frozen record.
    pub session: DuelSession,
    /// Winning seat; None on a draw.
    pub winner: Option<DuelRole>,
}

impl FinishedDuel {
    /// Outcome from one seat's perspective, for the rating update.
    pub fn outcome_for(&self, role: DuelRole) -> MatchOutcome {
        match self.winner {
            None => MatchOutcome::Draw,
            Some(w) if w == role => MatchOutcome::Win,
            Some(_) => MatchOutcome::Loss,
        }
    }
}

/// Coordinates duel records through their lifecycle.
pub struct DuelCoordinator {
    store: Arc<MemoryDuelStore>,
}

impl DuelCoordinator {
    /// Coordinator over a shared store.
    pub fn new(store: Arc<MemoryDuelStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<MemoryDuelStore> {
        &self.store
    }

    /// Create a Waiting lobby. The initial seed is provisional; `start`
    /// derives the real one so the host cannot scout rounds in advance.
    pub async fn create(
        &self,
        host_id: Uuid,
        host_name: &str,
        best_of: BestOf,
        public: bool,
        escrow_ref: Option<String>,
    ) -> Result<DuelSession, DuelError> {
        let now = Utc::now();
        for _ in 0..CODE_RETRY_LIMIT {
            let code = lobby_code();
            let session = DuelSession::new(
                code.clone(),
                host_id,
                host_name.to_string(),
                best_of,
                public,
                derive_duel_seed(&code, now.timestamp_millis() as u64),
                escrow_ref.clone(),
                now,
            );
            match self.store.insert_new(session.clone()).await {
                Ok(()) => {
                    info!(code = %session.code, host = %host_id, public, "duel created");
                    return Ok(session);
                }
                Err(DuelError::CodeExhausted) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(DuelError::CodeExhausted)
    }

    /// Claim the guest slot. Exactly one of any concurrent joiners wins.
    pub async fn join(
        &self,
        code: &str,
        guest_id: Uuid,
        guest_name: &str,
    ) -> Result<DuelSession, DuelError> {
        let session = self
            .store
            .try_claim_guest(code, guest_id, guest_name, Utc::now())
            .await?;
        info!(code = %code, guest = %guest_id, "duel joined");
        Ok(session)
    }

    /// Leave a duel. The host tearing down a live lobby kills the record;
    /// a guest leaving just reopens the slot.
    pub async fn leave(&self, code: &str, player_id: Uuid) -> Result<LeaveEffect, DuelError> {
        let (role, status) = {
            let session = self.store.get(code).await.ok_or(DuelError::NotFound)?;
            let role = session.role_of(player_id).ok_or(DuelError::NotInDuel)?;
            (role, session.status)
        };
        if status == DuelStatus::Finished {
            return Ok(LeaveEffect::None);
        }

        match role {
            DuelRole::Host => {
                self.store.remove(code).await;
                info!(code = %code, "duel abandoned by host");
                Ok(LeaveEffect::Deleted)
            }
            DuelRole::Guest => {
                self.store
                    .update(code, |session| {
                        session.guest_id = None;
                        session.guest_name = None;
                        session.guest_stats = PlayerStats::default();
                        session.status = DuelStatus::Waiting;
                        session.updated_at = Utc::now();
                        Ok(())
                    })
                    .await?;
                debug!(code = %code, "guest left, lobby reopened");
                Ok(LeaveEffect::Reverted)
            }
        }
    }

    /// Mark the external escrow funded. Host-only.
    pub async fn mark_funded(&self, code: &str, player_id: Uuid) -> Result<(), DuelError> {
        self.store
            .update(code, |session| {
                if session.role_of(player_id) != Some(DuelRole::Host) {
                    return Err(DuelError::NotHost);
                }
                match session.wager.as_mut() {
                    Some(wager) => {
                        wager.funded = true;
                        session.updated_at = Utc::now();
                        Ok(())
                    }
                    None => Ok(()),
                }
            })
            .await
    }

    /// Start the duel: host-only, both seats filled, wager funded. Assigns
    /// the seed both sides will generate rounds from and moves to Countdown.
    pub async fn start(&self, code: &str, player_id: Uuid) -> Result<DuelSession, DuelError> {
        let now = Utc::now();
        let seed = derive_duel_seed(code, now.timestamp_millis() as u64);
        let session = self
            .store
            .update(code, |session| {
                if session.role_of(player_id) != Some(DuelRole::Host) {
                    return Err(DuelError::NotHost);
                }
                if session.status != DuelStatus::Ready {
                    return Err(if session.guest_id.is_none() {
                        DuelError::NotReady
                    } else {
                        DuelError::AlreadyStarted
                    });
                }
                if session.wager_blocks_start() {
                    return Err(DuelError::WagerUnfunded);
                }
                session.seed = seed;
                session.status = DuelStatus::Countdown;
                session.host_stats = PlayerStats::default();
                session.guest_stats = PlayerStats::default();
                session.updated_at = now;
                Ok(session.clone())
            })
            .await?;
        info!(code = %code, seed = session.seed, "duel started");
        Ok(session)
    }

    /// Publish one seat's snapshot. First publish out of Countdown flips
    /// the record to Playing; each seat writes only its own fields, so
    /// concurrent publishes never conflict.
    pub async fn publish(
        &self,
        code: &str,
        player_id: Uuid,
        stats: PlayerStats,
    ) -> Result<DuelSession, DuelError> {
        self.store
            .update(code, |session| {
                let role = session.role_of(player_id).ok_or(DuelError::NotInDuel)?;
                match session.status {
                    DuelStatus::Countdown => session.status = DuelStatus::Playing,
                    DuelStatus::Playing => {}
                    _ => return Err(DuelError::AlreadyStarted),
                }
                match role {
                    DuelRole::Host => session.host_stats = stats,
                    DuelRole::Guest => session.guest_stats = stats,
                }
                session.updated_at = Utc::now();
                Ok(session.clone())
            })
            .await
    }

    /// Freeze the result. Either seat may call it; both resolve the same
    /// winner from the same snapshots. Idempotent once Finished, and only
    /// reachable from Countdown or Playing: a lobby that never started has
    /// no result to freeze.
    pub async fn finish(&self, code: &str, player_id: Uuid) -> Result<FinishedDuel, DuelError> {
        let session = self
            .store
            .update(code, |session| {
                session.role_of(player_id).ok_or(DuelError::NotInDuel)?;
                match session.status {
                    DuelStatus::Countdown | DuelStatus::Playing => {
                        session.status = DuelStatus::Finished;
                        session.updated_at = Utc::now();
                    }
                    DuelStatus::Finished => {}
                    DuelStatus::Waiting | DuelStatus::Ready => {
                        return Err(DuelError::NotStarted);
                    }
                }
                Ok(session.clone())
            })
            .await?;

        let winner = match session.host_stats.score.cmp(&session.guest_stats.score) {
            std::cmp::Ordering::Greater => Some(DuelRole::Host),
            std::cmp::Ordering::Less => Some(DuelRole::Guest),
            std::cmp::Ordering::Equal => None,
        };
        info!(code = %code, ?winner, "duel finished");
        Ok(FinishedDuel { session, winner })
    }

    /// Snapshot a record. `None` while a player believes the duel is live
    /// means the opponent's record vanished: an abandonment, not a loss.
    pub async fn snapshot(&self, code: &str) -> Option<DuelSession> {
        self.store.get(code).await
    }

    /// Public Waiting lobbies, excluding the caller's own.
    pub async fn list_public(&self, exclude_host: Uuid) -> Vec<DuelSummary> {
        self.store.list_public_waiting(exclude_host).await
    }

    /// Garbage-collect idle Waiting lobbies and spent Finished records.
    pub async fn sweep_idle(&self) -> usize {
        let swept = self
            .store
            .sweep_idle(Duration::minutes(IDLE_LOBBY_MINUTES), Utc::now())
            .await;
        if swept > 0 {
            info!(swept, "idle duel lobbies swept");
        }
        swept
    }
}

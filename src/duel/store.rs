//! In-memory duel store.
//!
//! A `BTreeMap` behind an async `RwLock`. All multi-step mutations happen
//! under the write guard, so the guest-slot claim is a true compare-and-swap
//! and concurrent joins cannot both succeed. Any row store with a
//! code-uniqueness constraint could replace this.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::session::{DuelSession, DuelStatus, DuelSummary};
use super::DuelError;

/// Shared duel records, keyed by join code.
pub struct MemoryDuelStore {
    sessions: RwLock<BTreeMap<String, DuelSession>>,
}

impl MemoryDuelStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert a fresh record. Fails if the code is already taken, so the
    /// caller can retry with a new code.
    pub async fn insert_new(&self, session: DuelSession) -> Result<(), DuelError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.code) {
            return Err(DuelError::CodeExhausted);
        }
        sessions.insert(session.code.clone(), session);
        Ok(())
    }

    /// Snapshot a record.
    pub async fn get(&self, code: &str) -> Option<DuelSession> {
        self.sessions.read().await.get(code).cloned()
    }

    /// Claim the guest slot. Checked and written under one write guard:
    /// of two concurrent claims exactly one wins, the other sees the
    /// slot taken.
    pub async fn try_claim_guest(
        &self,
        code: &str,
        guest_id: Uuid,
        guest_name: &str,
        now: DateTime<Utc>,
    ) -> Result<DuelSession, DuelError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(code).ok_or(DuelError::NotFound)?;
        if session.host_id == guest_id {
            return Err(DuelError::SelfJoin);
        }
        if !session.is_joinable() {
            return Err(DuelError::LobbyFull);
        }
        session.guest_id = Some(guest_id);
        session.guest_name = Some(guest_name.to_string());
        session.status = DuelStatus::Ready;
        session.updated_at = now;
        Ok(session.clone())
    }

    /// Mutate a record under the write guard. The closure's error aborts
    /// without partial writes becoming visible elsewhere mid-update.
    pub async fn update<T>(
        &self,
        code: &str,
        f: impl FnOnce(&mut DuelSession) -> Result<T, DuelError>,
    ) -> Result<T, DuelError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(code).ok_or(DuelError::NotFound)?;
        f(session)
    }

    /// Delete a record.
    pub async fn remove(&self, code: &str) -> Option<DuelSession> {
        self.sessions.write().await.remove(code)
    }

    /// Waiting public lobbies, excluding the caller's own.
    pub async fn list_public_waiting(&self, exclude_host: Uuid) -> Vec<DuelSummary> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.public && s.is_joinable() && s.host_id != exclude_host)
            .map(DuelSummary::from)
            .collect()
    }

    /// Drop records idle past `max_age`: Waiting lobbies nobody joined and
    /// Finished records both sides have already read. Returns how many went.
    pub async fn sweep_idle(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let stale: Vec<String> = sessions
            .values()
            .filter(|s| {
                matches!(s.status, DuelStatus::Waiting | DuelStatus::Finished)
                    && now - s.updated_at > max_age
            })
            .map(|s| s.code.clone())
            .collect();
        for code in &stale {
            sessions.remove(code);
        }
        stale.len()
    }

    /// Live record count.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for MemoryDuelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duel::session::BestOf;

    fn record(code: &str, host: Uuid, public: bool) -> DuelSession {
        DuelSession::new(
            code.into(),
            host,
            "host".into(),
            BestOf::Ten,
            public,
            1,
            None,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_code() {
        let store = MemoryDuelStore::new();
        let host = Uuid::new_v4();
        store.insert_new(record("AAAAAA", host, true)).await.unwrap();
        let err = store.insert_new(record("AAAAAA", host, true)).await;
        assert_eq!(err, Err(DuelError::CodeExhausted));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_claim_guest_is_first_wins() {
        let store = MemoryDuelStore::new();
        store
            .insert_new(record("AAAAAA", Uuid::new_v4(), true))
            .await
            .unwrap();

        let first = store
            .try_claim_guest("AAAAAA", Uuid::new_v4(), "g1", Utc::now())
            .await;
        assert!(first.is_ok());
        let second = store
            .try_claim_guest("AAAAAA", Uuid::new_v4(), "g2", Utc::now())
            .await;
        assert_eq!(second, Err(DuelError::LobbyFull));

        let session = store.get("AAAAAA").await.unwrap();
        assert_eq!(session.guest_name.as_deref(), Some("g1"));
        assert_eq!(session.status, DuelStatus::Ready);
    }

    #[tokio::test]
    async fn test_claim_rejects_host_self_join() {
        let store = MemoryDuelStore::new();
        let host = Uuid::new_v4();
        store.insert_new(record("AAAAAA", host, true)).await.unwrap();
        let result = store.try_claim_guest("AAAAAA", host, "host", Utc::now()).await;
        assert_eq!(result, Err(DuelError::SelfJoin));
    }

    #[tokio::test]
    async fn test_list_public_waiting_filters() {
        let store = MemoryDuelStore::new();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.insert_new(record("MINE11", me, true)).await.unwrap();
        store.insert_new(record("PUB111", other, true)).await.unwrap();
        store.insert_new(record("PRIV11", other, false)).await.unwrap();
        let mut full = record("FULL11", other, true);
        full.guest_id = Some(Uuid::new_v4());
        full.status = DuelStatus::Ready;
        store.insert_new(full).await.unwrap();

        let listed = store.list_public_waiting(me).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code, "PUB111");
    }

    #[tokio::test]
    async fn test_sweep_idle_drops_stale_waiting_and_finished() {
        let store = MemoryDuelStore::new();
        let host = Uuid::new_v4();
        let now = Utc::now();

        let mut stale = record("STALE1", host, true);
        stale.updated_at = now - Duration::minutes(30);
        store.insert_new(stale).await.unwrap();

        let mut stale_playing = record("PLAY11", host, true);
        stale_playing.updated_at = now - Duration::minutes(30);
        stale_playing.status = DuelStatus::Playing;
        store.insert_new(stale_playing).await.unwrap();

        // Finished records are the other leak path: nothing else deletes
        // them once both sides have read the result.
        let mut stale_finished = record("DONE11", host, true);
        stale_finished.updated_at = now - Duration::minutes(30);
        stale_finished.status = DuelStatus::Finished;
        store.insert_new(stale_finished).await.unwrap();

        store.insert_new(record("FRESH1", host, true)).await.unwrap();

        let swept = store.sweep_idle(Duration::minutes(10), now).await;
        assert_eq!(swept, 2);
        assert!(store.get("STALE1").await.is_none());
        assert!(store.get("DONE11").await.is_none());
        assert!(store.get("PLAY11").await.is_some());
        assert!(store.get("FRESH1").await.is_some());
    }
}

//! WebSocket Game Server
//!
//! Async WebSocket server. Each connection owns its player's
//! `SessionEngine` and is driven by a fixed-interval driver tick, so all
//! gameplay timestamps are taken from the server clock. The client sends
//! intent; the server measures.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::duel::coordinator::COUNTDOWN_MS;
use crate::duel::{
    BestOf, DuelCoordinator, DuelError, DuelRole, DuelStatus, MemoryDuelStore, PlayerStats,
};
use crate::game::round::RoundGenerator;
use crate::game::session::{EngineConfig, SessionEngine};
use crate::network::protocol::{ClientMessage, DuelView, ServerMessage};
use crate::rating::practice::SessionSummary;
use crate::storage::{GameMode, GameOutcome, HistoryEntry, PlayerStore};

/// Driver interval between engine polls.
pub const DRIVER_TICK_MS: u64 = 25;

/// Driver ticks between duel-record syncs (500ms).
const DUEL_SYNC_TICKS: u64 = 20;

/// Interval between idle-lobby sweeps.
const SWEEP_INTERVAL_SECS: u64 = 60;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::net::SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1_000,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the listen address.
    #[error("failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Server clock, milliseconds since the epoch.
fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Shared state every connection works against.
pub struct ServerState {
    /// Round generator over the loaded content set.
    pub generator: Arc<RoundGenerator>,
    /// Player ratings and history.
    pub players: Arc<PlayerStore>,
    /// Duel records.
    pub duels: Arc<DuelCoordinator>,
    /// Version reported in Welcome.
    pub version: String,
}

impl ServerState {
    /// Fresh state over a generator.
    pub fn new(generator: Arc<RoundGenerator>, version: String) -> Self {
        Self {
            generator,
            players: Arc::new(PlayerStore::new()),
            duels: Arc::new(DuelCoordinator::new(Arc::new(MemoryDuelStore::new()))),
            version,
        }
    }
}

// =============================================================================
// PER-CONNECTION STATE
// =============================================================================

/// One connected player: identity, their engine, and their duel seat.
struct ClientConn {
    state: Arc<ServerState>,
    player_id: Option<Uuid>,
    name: String,
    engine: Option<SessionEngine>,
    duel_code: Option<String>,
    duel_best_of: Option<BestOf>,
    last_duel_status: Option<DuelStatus>,
    last_opponent: Option<PlayerStats>,
    ticks: u64,
}

impl ClientConn {
    fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            player_id: None,
            name: String::new(),
            engine: None,
            duel_code: None,
            duel_best_of: None,
            last_duel_status: None,
            last_opponent: None,
            ticks: 0,
        }
    }

    fn in_duel(&self) -> bool {
        self.duel_code.is_some()
    }

    /// This side's snapshot for the shared duel record, straight from the
    /// server-side engine.
    fn own_snapshot(&self) -> PlayerStats {
        match &self.engine {
            Some(engine) => {
                let stats = engine.stats();
                PlayerStats {
                    score: stats.score,
                    streak: stats.streak,
                    best_time_ms: stats.best_time_ms,
                    last_time_ms: stats.last_time_ms,
                    round_index: engine.round_index(),
                }
            }
            None => PlayerStats::default(),
        }
    }

    /// Handle one client message, producing the replies to send.
    async fn handle_message(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        // Everything but Hello and Ping requires an introduced player.
        let introduced = self.player_id.is_some();
        match msg {
            ClientMessage::Hello { player_id, name } => self.on_hello(player_id, name).await,
            ClientMessage::Ping { timestamp } => vec![ServerMessage::Pong { timestamp }],
            _ if !introduced => vec![ServerMessage::Error {
                message: "say hello first".into(),
            }],

            ClientMessage::ArmEnter => self.on_arm_enter(),
            ClientMessage::ArmLeave => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.arm_leave(now_ms());
                }
                Vec::new()
            }
            ClientMessage::FocusLost => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.focus_lost(now_ms());
                }
                Vec::new()
            }
            ClientMessage::FocusGained => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.focus_gained(now_ms());
                }
                Vec::new()
            }
            ClientMessage::Select { item_id } => {
                // Timestamped here, server-side, not from any client clock.
                match self.engine.as_mut() {
                    Some(engine) => engine
                        .select(&item_id, now_ms())
                        .iter()
                        .filter_map(ServerMessage::from_event)
                        .collect(),
                    None => Vec::new(),
                }
            }
            ClientMessage::EndSession => self.on_end_session().await,

            ClientMessage::CreateDuel {
                best_of,
                public,
                escrow_ref,
            } => self.on_create_duel(best_of, public, escrow_ref).await,
            ClientMessage::JoinDuel { code } => self.on_join_duel(&code).await,
            ClientMessage::ListDuels => {
                let player = self.player_id.unwrap_or_else(Uuid::nil);
                let duels = self.state.duels.list_public(player).await;
                vec![ServerMessage::DuelList { duels }]
            }
            ClientMessage::LeaveDuel => self.on_leave_duel().await,
            ClientMessage::StartDuel => self.on_start_duel().await,
            ClientMessage::FundWager => self.on_fund_wager().await,
            ClientMessage::PublishStats => self.publish_snapshot().await,
            ClientMessage::FinishDuel => self.on_finish_duel().await,
        }
    }

    async fn on_hello(&mut self, player_id: Option<Uuid>, name: String) -> Vec<ServerMessage> {
        let id = player_id.unwrap_or_else(Uuid::new_v4);
        self.player_id = Some(id);
        self.name = if name.trim().is_empty() {
            "anon".to_string()
        } else {
            name.trim().chars().take(24).collect()
        };
        let record = self.state.players.record(id).await;
        info!(player = %id, name = %self.name, "player introduced");
        vec![ServerMessage::Welcome {
            player_id: id,
            record,
            version: self.state.version.clone(),
        }]
    }

    fn on_arm_enter(&mut self) -> Vec<ServerMessage> {
        // Duel rounds are bounded by best-of; practice is open-ended.
        if let (Some(best_of), Some(engine)) = (self.duel_best_of, self.engine.as_ref()) {
            if engine.round_index() >= best_of.rounds() {
                return vec![ServerMessage::Error {
                    message: "match complete".into(),
                }];
            }
        }
        let engine = self.engine.get_or_insert_with(|| {
            SessionEngine::new(
                Arc::clone(&self.state.generator),
                EngineConfig::default(),
            )
        });
        engine.arm_enter(now_ms());
        Vec::new()
    }

    async fn on_end_session(&mut self) -> Vec<ServerMessage> {
        if self.in_duel() {
            return vec![ServerMessage::Error {
                message: "leave the duel first".into(),
            }];
        }
        let Some(engine) = self.engine.take() else {
            return Vec::new();
        };
        let Some(player) = self.player_id else {
            return Vec::new();
        };

        let stats = engine.stats().clone();
        let summary = SessionSummary::from_stats(&stats);
        let (rating, session_score) = self
            .state
            .players
            .record_practice_session(player, summary)
            .await;
        let record = self.state.players.record(player).await;

        self.state
            .players
            .append_history(HistoryEntry {
                player,
                mode: GameMode::Practice,
                outcome: GameOutcome::Completed,
                score: stats.score,
                opponent_score: None,
                rounds: summary.rounds,
                accuracy_pct: stats.accuracy_pct(),
                best_time_ms: stats.best_time_ms,
                best_streak: stats.best_streak,
                created_at: Utc::now(),
            })
            .await;

        info!(player = %player, session_score, rating = rating.current, "practice session rated");
        vec![ServerMessage::SessionEnded {
            summary,
            session_score,
            rating,
            tier: record.practice_tier().label().to_string(),
        }]
    }

    async fn on_create_duel(
        &mut self,
        best_of: u32,
        public: bool,
        escrow_ref: Option<String>,
    ) -> Vec<ServerMessage> {
        let Some(player) = self.player_id else {
            return Vec::new();
        };
        if self.in_duel() {
            return vec![ServerMessage::Error {
                message: "already in a game".into(),
            }];
        }
        let best_of = BestOf::from_rounds(best_of);
        match self
            .state
            .duels
            .create(player, &self.name, best_of, public, escrow_ref)
            .await
        {
            Ok(session) => {
                self.duel_code = Some(session.code.clone());
                self.duel_best_of = Some(best_of);
                self.last_duel_status = Some(session.status);
                self.engine = None;
                vec![ServerMessage::DuelCreated {
                    duel: DuelView::from(&session),
                }]
            }
            Err(e) => vec![error_message(e)],
        }
    }

    async fn on_join_duel(&mut self, code: &str) -> Vec<ServerMessage> {
        let Some(player) = self.player_id else {
            return Vec::new();
        };
        if self.in_duel() {
            return vec![ServerMessage::Error {
                message: "already in a game".into(),
            }];
        }
        let code = code.trim().to_ascii_uppercase();
        match self.state.duels.join(&code, player, &self.name).await {
            Ok(session) => {
                self.duel_code = Some(session.code.clone());
                self.duel_best_of = Some(session.best_of);
                self.last_duel_status = Some(session.status);
                self.engine = None;
                vec![ServerMessage::DuelState {
                    duel: DuelView::from(&session),
                    opponent: None,
                }]
            }
            Err(e) => vec![error_message(e)],
        }
    }

    async fn on_leave_duel(&mut self) -> Vec<ServerMessage> {
        let (Some(code), Some(player)) = (self.duel_code.clone(), self.player_id) else {
            return Vec::new();
        };
        let result = self.state.duels.leave(&code, player).await;
        self.clear_duel();
        match result {
            Ok(_) | Err(DuelError::NotFound) => Vec::new(),
            Err(e) => vec![error_message(e)],
        }
    }

    async fn on_start_duel(&mut self) -> Vec<ServerMessage> {
        let (Some(code), Some(player)) = (self.duel_code.clone(), self.player_id) else {
            return Vec::new();
        };
        match self.state.duels.start(&code, player).await {
            Ok(session) => {
                self.enter_countdown(session.seed);
                self.last_duel_status = Some(session.status);
                vec![
                    ServerMessage::DuelStarted {
                        countdown_ms: COUNTDOWN_MS,
                    },
                    ServerMessage::DuelState {
                        duel: DuelView::from(&session),
                        opponent: Some(*session.opponent_stats(DuelRole::Host)),
                    },
                ]
            }
            Err(e) => vec![error_message(e)],
        }
    }

    async fn on_fund_wager(&mut self) -> Vec<ServerMessage> {
        let (Some(code), Some(player)) = (self.duel_code.clone(), self.player_id) else {
            return Vec::new();
        };
        match self.state.duels.mark_funded(&code, player).await {
            Ok(()) => match self.state.duels.snapshot(&code).await {
                Some(session) => vec![ServerMessage::DuelState {
                    duel: DuelView::from(&session),
                    opponent: None,
                }],
                None => Vec::new(),
            },
            Err(e) => vec![error_message(e)],
        }
    }

    /// Push this side's engine snapshot into the shared record.
    async fn publish_snapshot(&mut self) -> Vec<ServerMessage> {
        let (Some(code), Some(player)) = (self.duel_code.clone(), self.player_id) else {
            return Vec::new();
        };
        let snapshot = self.own_snapshot();
        match self.state.duels.publish(&code, player, snapshot).await {
            Ok(_) => Vec::new(),
            Err(DuelError::NotFound) => self.on_duel_vanished().await,
            Err(_) => Vec::new(),
        }
    }

    async fn on_finish_duel(&mut self) -> Vec<ServerMessage> {
        let (Some(code), Some(player)) = (self.duel_code.clone(), self.player_id) else {
            return Vec::new();
        };
        // Final snapshot first so both sides judge the same numbers.
        let snapshot = self.own_snapshot();
        let _ = self.state.duels.publish(&code, player, snapshot).await;

        let finished = match self.state.duels.finish(&code, player).await {
            Ok(f) => f,
            Err(DuelError::NotFound) => return self.on_duel_vanished().await,
            Err(e) => return vec![error_message(e)],
        };

        let session = &finished.session;
        let Some(role) = session.role_of(player) else {
            return vec![error_message(DuelError::NotInDuel)];
        };
        let outcome = finished.outcome_for(role);

        let opponent_id = match role {
            DuelRole::Host => session.guest_id,
            DuelRole::Guest => Some(session.host_id),
        };
        let rating = match opponent_id {
            Some(opponent) => {
                let opponent_rating = self.state.players.record(opponent).await.duel.rating;
                Some(
                    self.state
                        .players
                        .record_duel_match(player, opponent_rating, outcome)
                        .await,
                )
            }
            None => None,
        };

        let own = session.stats_of(role);
        let engine_stats = self.engine.as_ref().map(|e| e.stats().clone());
        self.state
            .players
            .append_history(HistoryEntry {
                player,
                mode: GameMode::Duel,
                outcome: outcome.into(),
                score: own.score,
                opponent_score: Some(session.opponent_stats(role).score),
                rounds: own.round_index,
                accuracy_pct: engine_stats.as_ref().map(|s| s.accuracy_pct()).unwrap_or(0),
                best_time_ms: own.best_time_ms,
                best_streak: engine_stats.map(|s| s.best_streak).unwrap_or(0),
                created_at: Utc::now(),
            })
            .await;

        let reply = ServerMessage::DuelFinished {
            duel: DuelView::from(session),
            winner: finished.winner,
            you: role,
            rating,
        };
        self.clear_duel();
        vec![reply]
    }

    /// The record is gone while this side thought the duel was live.
    async fn on_duel_vanished(&mut self) -> Vec<ServerMessage> {
        let player = self.player_id;
        let was_live = self
            .last_duel_status
            .map(|s| s != DuelStatus::Finished)
            .unwrap_or(false);
        self.clear_duel();

        if let (Some(player), true) = (player, was_live) {
            self.state
                .players
                .append_history(HistoryEntry {
                    player,
                    mode: GameMode::Duel,
                    outcome: GameOutcome::Abandoned,
                    score: 0,
                    opponent_score: None,
                    rounds: 0,
                    accuracy_pct: 0,
                    best_time_ms: None,
                    best_streak: 0,
                    created_at: Utc::now(),
                })
                .await;
            warn!(player = %player, "duel record vanished, treating as abandonment");
        }
        vec![ServerMessage::DuelAbandoned]
    }

    fn enter_countdown(&mut self, seed: u64) {
        self.engine = Some(SessionEngine::new(
            Arc::clone(&self.state.generator),
            EngineConfig::duel(seed),
        ));
    }

    fn clear_duel(&mut self) {
        self.duel_code = None;
        self.duel_best_of = None;
        self.last_duel_status = None;
        self.last_opponent = None;
        self.engine = None;
    }

    /// Driver tick: poll the engine, and periodically sync the duel record.
    async fn tick(&mut self) -> Vec<ServerMessage> {
        self.ticks += 1;
        let mut out = Vec::new();

        if let Some(engine) = self.engine.as_mut() {
            out.extend(
                engine
                    .poll(now_ms())
                    .iter()
                    .filter_map(ServerMessage::from_event),
            );
        }

        if self.in_duel() && self.ticks % DUEL_SYNC_TICKS == 0 {
            out.extend(self.sync_duel().await);
        }

        out
    }

    /// Periodic duel sync: publish our snapshot, surface status changes and
    /// opponent progress, detect vanished records.
    async fn sync_duel(&mut self) -> Vec<ServerMessage> {
        let (Some(code), Some(player)) = (self.duel_code.clone(), self.player_id) else {
            return Vec::new();
        };
        let Some(session) = self.state.duels.snapshot(&code).await else {
            return self.on_duel_vanished().await;
        };
        let Some(role) = session.role_of(player) else {
            // Guest seat was reopened and re-taken while we were away.
            return self.on_duel_vanished().await;
        };

        let mut out = Vec::new();

        // Guest learns about the start through the record.
        if matches!(session.status, DuelStatus::Countdown | DuelStatus::Playing)
            && self.engine.is_none()
        {
            self.enter_countdown(session.seed);
            out.push(ServerMessage::DuelStarted {
                countdown_ms: COUNTDOWN_MS,
            });
        }

        if matches!(session.status, DuelStatus::Countdown | DuelStatus::Playing) {
            let snapshot = self.own_snapshot();
            let _ = self.state.duels.publish(&code, player, snapshot).await;
        }

        let opponent = *session.opponent_stats(role);
        let status_changed = self.last_duel_status != Some(session.status);
        let opponent_changed = self.last_opponent != Some(opponent);
        if status_changed || opponent_changed {
            self.last_duel_status = Some(session.status);
            self.last_opponent = Some(opponent);
            out.push(ServerMessage::DuelState {
                duel: DuelView::from(&session),
                opponent: if session.status == DuelStatus::Waiting {
                    None
                } else {
                    Some(opponent)
                },
            });
        }

        out
    }

    /// Connection dropped: a live duel seat is vacated.
    async fn on_disconnect(&mut self) {
        if let (Some(code), Some(player)) = (self.duel_code.clone(), self.player_id) {
            let _ = self.state.duels.leave(&code, player).await;
            debug!(player = %player, code = %code, "seat vacated on disconnect");
        }
    }
}

fn error_message(e: DuelError) -> ServerMessage {
    ServerMessage::Error {
        message: e.to_string(),
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// The game server.
pub struct GameServer {
    config: ServerConfig,
    state: Arc<ServerState>,
    connections: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server over a validated round generator.
    pub fn new(config: ServerConfig, generator: Arc<RoundGenerator>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = Arc::new(ServerState::new(generator, config.version.clone()));
        Self {
            config,
            state,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Shared state (for tests and embedding).
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the accept loop until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("listening on {}", self.config.bind_addr);

        // Background idle-lobby sweeper.
        let sweep_duels = Arc::clone(&self.state.duels);
        let mut sweep_shutdown = self.shutdown_tx.subscribe();
        let sweeper = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweep_duels.sweep_idle().await;
                    }
                    _ = sweep_shutdown.recv() => break,
                }
            }
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!("connection limit reached, rejecting {addr}");
                                continue;
                            }
                            self.spawn_connection(stream, addr);
                        }
                        Err(e) => error!("accept error: {e}"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        sweeper.abort();
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let state = Arc::clone(&self.state);
        let connections = Arc::clone(&self.connections);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        connections.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            debug!("connection from {addr}");
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("handshake failed for {addr}: {e}");
                    connections.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(128);

            // Outbound writer task.
            let writer = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("serialize failed: {e}");
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut conn = ClientConn::new(state);
            let mut driver = interval(Duration::from_millis(DRIVER_TICK_MS));

            loop {
                tokio::select! {
                    incoming = ws_receiver.next() => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                let msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("bad message from {addr}: {e}");
                                        let _ = msg_tx.send(ServerMessage::Error {
                                            message: "invalid message".into(),
                                        }).await;
                                        continue;
                                    }
                                };
                                for reply in conn.handle_message(msg).await {
                                    if msg_tx.send(reply).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                debug!("socket error from {addr}: {e}");
                                break;
                            }
                        }
                    }
                    _ = driver.tick() => {
                        for out in conn.tick().await {
                            if msg_tx.send(out).await.is_err() {
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            conn.on_disconnect().await;
            drop(msg_tx);
            let _ = writer.await;
            connections.fetch_sub(1, Ordering::Relaxed);
            debug!("connection closed: {addr}");
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentSet;

    fn test_state() -> Arc<ServerState> {
        let generator = Arc::new(RoundGenerator::new(ContentSet::builtin()).unwrap());
        Arc::new(ServerState::new(generator, "test".into()))
    }

    async fn hello(conn: &mut ClientConn, name: &str) -> Uuid {
        let replies = conn
            .handle_message(ClientMessage::Hello {
                player_id: None,
                name: name.into(),
            })
            .await;
        match &replies[0] {
            ServerMessage::Welcome { player_id, .. } => *player_id,
            other => panic!("expected welcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hello_assigns_identity() {
        let mut conn = ClientConn::new(test_state());
        let id = hello(&mut conn, "  degen  ").await;
        assert!(!id.is_nil());
        assert_eq!(conn.name, "degen");
    }

    #[tokio::test]
    async fn test_messages_before_hello_rejected() {
        let mut conn = ClientConn::new(test_state());
        let replies = conn.handle_message(ClientMessage::ArmEnter).await;
        assert!(matches!(replies[0], ServerMessage::Error { .. }));
        // Ping is allowed pre-hello.
        let replies = conn.handle_message(ClientMessage::Ping { timestamp: 7 }).await;
        assert!(matches!(replies[0], ServerMessage::Pong { timestamp: 7 }));
    }

    #[tokio::test]
    async fn test_end_session_rates_and_clears_engine() {
        let mut conn = ClientConn::new(test_state());
        let player = hello(&mut conn, "solo").await;

        conn.handle_message(ClientMessage::ArmEnter).await;
        assert!(conn.engine.is_some());

        let replies = conn.handle_message(ClientMessage::EndSession).await;
        assert!(matches!(replies[0], ServerMessage::SessionEnded { .. }));
        assert!(conn.engine.is_none());

        let record = conn.state.players.record(player).await;
        assert_eq!(record.practice.sessions, 1);
        let history = conn.state.players.history_of(player).await;
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_duel_lifecycle_over_two_connections() {
        let state = test_state();
        let mut host = ClientConn::new(Arc::clone(&state));
        let mut guest = ClientConn::new(Arc::clone(&state));
        hello(&mut host, "host").await;
        hello(&mut guest, "guest").await;

        let replies = host
            .handle_message(ClientMessage::CreateDuel {
                best_of: 10,
                public: true,
                escrow_ref: None,
            })
            .await;
        let code = match &replies[0] {
            ServerMessage::DuelCreated { duel } => duel.code.clone(),
            other => panic!("expected duel_created, got {other:?}"),
        };

        let replies = guest
            .handle_message(ClientMessage::JoinDuel { code: code.clone() })
            .await;
        assert!(matches!(replies[0], ServerMessage::DuelState { .. }));

        // Guest cannot start.
        let replies = guest.handle_message(ClientMessage::StartDuel).await;
        assert!(matches!(replies[0], ServerMessage::Error { .. }));

        let replies = host.handle_message(ClientMessage::StartDuel).await;
        assert!(matches!(replies[0], ServerMessage::DuelStarted { .. }));
        assert!(host.engine.is_some());

        // Guest picks up the start on its next duel sync.
        let replies = guest.sync_duel().await;
        assert!(replies
            .iter()
            .any(|m| matches!(m, ServerMessage::DuelStarted { .. })));
        assert!(guest.engine.is_some());

        // Either side can finish; both get a frozen result.
        let replies = host.handle_message(ClientMessage::FinishDuel).await;
        let (winner, you) = match &replies[0] {
            ServerMessage::DuelFinished { winner, you, .. } => (*winner, *you),
            other => panic!("expected duel_finished, got {other:?}"),
        };
        assert_eq!(you, DuelRole::Host);
        // Neither side scored: a draw.
        assert_eq!(winner, None);
        assert!(!host.in_duel());
    }

    #[tokio::test]
    async fn test_finish_before_start_is_rejected() {
        let state = test_state();
        let mut host = ClientConn::new(Arc::clone(&state));
        let mut guest = ClientConn::new(Arc::clone(&state));
        hello(&mut host, "host").await;
        let guest_id = hello(&mut guest, "guest").await;

        let replies = host
            .handle_message(ClientMessage::CreateDuel {
                best_of: 10,
                public: true,
                escrow_ref: None,
            })
            .await;
        let code = match &replies[0] {
            ServerMessage::DuelCreated { duel } => duel.code.clone(),
            other => panic!("expected duel_created, got {other:?}"),
        };
        guest
            .handle_message(ClientMessage::JoinDuel { code: code.clone() })
            .await;

        // Joining and finishing straight away must not freeze a 0-0 result.
        let replies = guest.handle_message(ClientMessage::FinishDuel).await;
        match &replies[0] {
            ServerMessage::Error { message } => assert_eq!(message, "game not started"),
            other => panic!("expected error, got {other:?}"),
        }

        // Nothing was rated or recorded, and the lobby is intact.
        let record = guest.state.players.record(guest_id).await;
        assert_eq!(record.duel.matches_played, 0);
        assert!(guest.state.players.history_of(guest_id).await.is_empty());
        assert!(guest.in_duel());
        let snapshot = state.duels.snapshot(&code).await.unwrap();
        assert_eq!(snapshot.status, DuelStatus::Ready);
    }

    #[tokio::test]
    async fn test_join_bad_code_reports_not_found() {
        let mut conn = ClientConn::new(test_state());
        hello(&mut conn, "guest").await;
        let replies = conn
            .handle_message(ClientMessage::JoinDuel {
                code: "ZZZZZZ".into(),
            })
            .await;
        match &replies[0] {
            ServerMessage::Error { message } => assert_eq!(message, "game not found"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_vanished_duel_is_abandonment() {
        let state = test_state();
        let mut host = ClientConn::new(Arc::clone(&state));
        let mut guest = ClientConn::new(Arc::clone(&state));
        hello(&mut host, "host").await;
        let guest_id = hello(&mut guest, "guest").await;

        let replies = host
            .handle_message(ClientMessage::CreateDuel {
                best_of: 5,
                public: false,
                escrow_ref: None,
            })
            .await;
        let code = match &replies[0] {
            ServerMessage::DuelCreated { duel } => duel.code.clone(),
            other => panic!("expected duel_created, got {other:?}"),
        };
        guest
            .handle_message(ClientMessage::JoinDuel { code: code.clone() })
            .await;
        host.handle_message(ClientMessage::StartDuel).await;
        guest.sync_duel().await;

        // Host walks; the record dies.
        host.handle_message(ClientMessage::LeaveDuel).await;

        let replies = guest.sync_duel().await;
        assert!(replies
            .iter()
            .any(|m| matches!(m, ServerMessage::DuelAbandoned)));
        assert!(!guest.in_duel());

        // Recorded as abandonment, not a loss, and unrated.
        let history = state.players.history_of(guest_id).await;
        assert_eq!(history[0].outcome, GameOutcome::Abandoned);
        let record = state.players.record(guest_id).await;
        assert_eq!(record.duel.matches_played, 0);
    }

    #[tokio::test]
    async fn test_wagered_duel_gated_until_funded() {
        let state = test_state();
        let mut host = ClientConn::new(Arc::clone(&state));
        let mut guest = ClientConn::new(Arc::clone(&state));
        hello(&mut host, "host").await;
        hello(&mut guest, "guest").await;

        let replies = host
            .handle_message(ClientMessage::CreateDuel {
                best_of: 10,
                public: false,
                escrow_ref: Some("esc-9".into()),
            })
            .await;
        let code = match &replies[0] {
            ServerMessage::DuelCreated { duel } => duel.code.clone(),
            other => panic!("expected duel_created, got {other:?}"),
        };
        guest.handle_message(ClientMessage::JoinDuel { code }).await;

        let replies = host.handle_message(ClientMessage::StartDuel).await;
        match &replies[0] {
            ServerMessage::Error { message } => assert_eq!(message, "wager not funded"),
            other => panic!("expected error, got {other:?}"),
        }

        host.handle_message(ClientMessage::FundWager).await;
        let replies = host.handle_message(ClientMessage::StartDuel).await;
        assert!(matches!(replies[0], ServerMessage::DuelStarted { .. }));
    }
}

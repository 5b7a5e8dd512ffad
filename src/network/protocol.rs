//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. JSON with a
//! `type` tag on both directions.
//!
//! The server is authoritative: feed items cross the wire without their
//! kind, and the target is only revealed in the round result. A client
//! reading the traffic learns nothing the player cannot see on screen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{FillerPost, SignalPost};
use crate::duel::session::DuelSummary;
use crate::duel::{DuelRole, DuelSession, DuelStatus, PlayerStats};
use crate::game::round::{Item, ItemMeta, Round};
use crate::game::session::{RoundOutcome, SessionEvent, SessionStats};
use crate::rating::practice::SessionSummary;
use crate::storage::{PlayerRecord, RatingChange};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Introduce the player. First message on every connection.
    Hello {
        /// Returning player id; omitted on first visit.
        player_id: Option<Uuid>,
        /// Display name.
        name: String,
    },

    /// Arm intent began (button press / hold start).
    ArmEnter,

    /// Arm intent withdrawn before launch.
    ArmLeave,

    /// The client tab lost focus.
    FocusLost,

    /// The client tab regained focus.
    FocusGained,

    /// The player picked an item from the feed.
    Select {
        /// Id of the picked item.
        item_id: String,
    },

    /// End the practice session and collect the rating.
    EndSession,

    /// Create a duel lobby.
    CreateDuel {
        /// Requested match length in rounds (5/10/20).
        best_of: u32,
        /// List in the public browser.
        public: bool,
        /// External escrow reference for a wagered duel.
        escrow_ref: Option<String>,
    },

    /// Join a duel lobby by code.
    JoinDuel {
        /// 6-character join code.
        code: String,
    },

    /// Browse public Waiting lobbies.
    ListDuels,

    /// Leave the current duel.
    LeaveDuel,

    /// Start the duel (host only).
    StartDuel,

    /// Report the external escrow as funded (host only).
    FundWager,

    /// Push this side's score snapshot to the shared record. The snapshot
    /// itself comes from the server-side engine, never from the client.
    PublishStats,

    /// Freeze the duel result.
    FinishDuel,

    /// Ping for latency measurement.
    Ping {
        /// Echoed back in the pong.
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// A feed item as the client sees it: no kind, no target flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    /// Item id, echoed back in `Select`.
    pub id: String,
    /// Canonical name.
    pub name: String,
    /// Presentation name.
    pub display_name: String,
    /// Marker glyph.
    pub marker: String,
    /// Cosmetic metadata.
    pub meta: ItemMeta,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            display_name: item.display_name.clone(),
            marker: item.marker.clone(),
            meta: item.meta.clone(),
        }
    }
}

/// A round as the client sees it: the signal and pacing, not the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundView {
    /// Zero-based round index.
    pub round_index: u32,
    /// Effective difficulty.
    pub difficulty: u32,
    /// The signal post naming the target.
    pub signal: SignalPost,
    /// Background filler posts.
    pub fillers: Vec<FillerPost>,
    /// How many candidates will spawn.
    pub candidate_count: usize,
    /// Delay between candidate spawns.
    pub spawn_delay_ms: u64,
    /// Interval between noise items after the board fills.
    pub noise_interval_ms: u64,
}

impl From<&Round> for RoundView {
    fn from(round: &Round) -> Self {
        Self {
            round_index: round.round_index,
            difficulty: round.difficulty,
            signal: round.signal.clone(),
            fillers: round.fillers.clone(),
            candidate_count: round.candidates.len(),
            spawn_delay_ms: round.spawn_delay_ms,
            noise_interval_ms: round.noise_interval_ms,
        }
    }
}

/// A duel record as the client sees it: no seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelView {
    /// Join code.
    pub code: String,
    /// Host display name.
    pub host_name: String,
    /// Guest display name, once seated.
    pub guest_name: Option<String>,
    /// Lifecycle status.
    pub status: DuelStatus,
    /// Match length in rounds.
    pub best_of: u32,
    /// Listed publicly.
    pub public: bool,
    /// Wager attached.
    pub wagered: bool,
    /// Wager funded.
    pub funded: bool,
}

impl From<&DuelSession> for DuelView {
    fn from(session: &DuelSession) -> Self {
        Self {
            code: session.code.clone(),
            host_name: session.host_name.clone(),
            guest_name: session.guest_name.clone(),
            status: session.status,
            best_of: session.best_of.rounds(),
            public: session.public,
            wagered: session.wager.is_some(),
            funded: session.wager.as_ref().map(|w| w.funded).unwrap_or(false),
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session established.
    Welcome {
        /// Assigned (or confirmed) player id.
        player_id: Uuid,
        /// Current ratings.
        record: PlayerRecord,
        /// Server version.
        version: String,
    },

    /// Arm ramp completed; launch imminent.
    Armed,

    /// A round launched.
    RoundStarted {
        /// Redacted round payload.
        round: RoundView,
        /// Server launch timestamp.
        at_ms: u64,
    },

    /// A feed item became visible. Candidates and noise look identical.
    ItemSpawned {
        /// Redacted item payload.
        item: ItemView,
        /// Server spawn timestamp.
        at_ms: u64,
    },

    /// The round resolved; the target is revealed here and only here.
    RoundResult {
        /// Hit, miss, or timeout.
        outcome: RoundOutcome,
        /// Server-measured reaction time (hits only).
        reaction_ms: Option<u64>,
        /// The correct answer.
        target: Item,
        /// Updated session counters.
        stats: SessionStats,
        /// Current multiplier, hundredths.
        multiplier_hundredths: u32,
    },

    /// Sudden-death run ended.
    RunEnded {
        /// The failing outcome.
        reason: RoundOutcome,
    },

    /// Cooldown over; arming is available again.
    ReadyForRound {
        /// Index of the next round.
        next_round_index: u32,
    },

    /// Practice session closed and rated.
    SessionEnded {
        /// Final counters the rating was computed from.
        summary: SessionSummary,
        /// Session score on the 0-1000 curve.
        session_score: u32,
        /// Rating movement.
        rating: RatingChange,
        /// Tier label after the update.
        tier: String,
    },

    /// Duel lobby created.
    DuelCreated {
        /// The new lobby.
        duel: DuelView,
    },

    /// Duel state changed (join, leave, start, opponent progress).
    DuelState {
        /// Current record.
        duel: DuelView,
        /// The opponent's latest snapshot, once playing.
        opponent: Option<PlayerStats>,
    },

    /// Countdown started; rounds begin when it runs out.
    DuelStarted {
        /// Fixed countdown length.
        countdown_ms: u64,
    },

    /// Public lobby listing.
    DuelList {
        /// Waiting public lobbies.
        duels: Vec<DuelSummary>,
    },

    /// The duel result, frozen.
    DuelFinished {
        /// Final record.
        duel: DuelView,
        /// Winning seat; None on a draw.
        winner: Option<DuelRole>,
        /// This connection's seat.
        you: DuelRole,
        /// Rating movement, if the match was rated.
        rating: Option<RatingChange>,
    },

    /// The opponent's record vanished mid-duel. Not a loss.
    DuelAbandoned,

    /// Operation failed; message is safe to show the player.
    Error {
        /// Short user-facing message.
        message: String,
    },

    /// Ping response.
    Pong {
        /// Echo of the ping timestamp.
        timestamp: u64,
    },
}

impl ServerMessage {
    /// Wire form of an engine event, redacted for the client. Target
    /// visibility is server-internal and produces no message.
    pub fn from_event(event: &SessionEvent) -> Option<Self> {
        match event {
            SessionEvent::Armed => Some(Self::Armed),
            SessionEvent::RoundLaunched { round, at_ms } => Some(Self::RoundStarted {
                round: RoundView::from(round),
                at_ms: *at_ms,
            }),
            SessionEvent::CandidateSpawned { item, at_ms, .. } => Some(Self::ItemSpawned {
                item: ItemView::from(item),
                at_ms: *at_ms,
            }),
            SessionEvent::NoiseSpawned { item, at_ms } => Some(Self::ItemSpawned {
                item: ItemView::from(item),
                at_ms: *at_ms,
            }),
            SessionEvent::TargetVisible { .. } => None,
            SessionEvent::RoundResolved {
                outcome,
                reaction_ms,
                target,
                stats,
                multiplier_hundredths,
                ..
            } => Some(Self::RoundResult {
                outcome: *outcome,
                reaction_ms: *reaction_ms,
                target: target.clone(),
                stats: stats.clone(),
                multiplier_hundredths: *multiplier_hundredths,
            }),
            SessionEvent::RunEnded { reason } => Some(Self::RunEnded { reason: *reason }),
            SessionEvent::CooldownEnded { next_round_index } => Some(Self::ReadyForRound {
                next_round_index: *next_round_index,
            }),
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentSet;
    use crate::game::round::RoundGenerator;

    #[test]
    fn test_client_message_round_trip() {
        let msg = ClientMessage::Select {
            item_id: "r0-3".into(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"select\""));
        let parsed = ClientMessage::from_json(&json).unwrap();
        match parsed {
            ClientMessage::Select { item_id } => assert_eq!(item_id, "r0-3"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_hello_without_player_id() {
        let json = r#"{"type":"hello","player_id":null,"name":"degen"}"#;
        let parsed = ClientMessage::from_json(json).unwrap();
        assert!(matches!(
            parsed,
            ClientMessage::Hello {
                player_id: None,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_round_view_hides_the_answer() {
        let generator = RoundGenerator::new(ContentSet::builtin()).unwrap();
        let round = generator.generate(5, Some(99), 10);
        let view = RoundView::from(&round);
        let json = serde_json::to_string(&view).unwrap();

        // The wire payload never carries a kind marker.
        assert!(!json.contains("\"kind\""));
        assert_eq!(view.candidate_count, round.candidates.len());
    }

    #[test]
    fn test_item_view_strips_kind() {
        let generator = RoundGenerator::new(ContentSet::builtin()).unwrap();
        let round = generator.generate(3, Some(7), 10);
        let view = ItemView::from(round.target());
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("\"kind\""));
        assert!(!json.contains("target"));
    }

    #[test]
    fn test_target_visible_has_no_wire_form() {
        assert!(ServerMessage::from_event(&SessionEvent::TargetVisible { at_ms: 123 }).is_none());
        assert!(ServerMessage::from_event(&SessionEvent::Armed).is_some());
    }

    #[test]
    fn test_round_result_reveals_target() {
        let generator = RoundGenerator::new(ContentSet::builtin()).unwrap();
        let round = generator.generate(0, Some(11), 10);
        let event = SessionEvent::RoundResolved {
            outcome: RoundOutcome::Hit,
            reaction_ms: Some(412),
            selected_id: Some(round.target().id.clone()),
            target: round.target().clone(),
            stats: SessionStats::default(),
            multiplier_hundredths: 100,
        };
        let msg = ServerMessage::from_event(&event).unwrap();
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"round_result\""));
        assert!(json.contains(&round.target_name));
    }

    #[test]
    fn test_server_message_round_trip() {
        let msg = ServerMessage::Pong { timestamp: 42 };
        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert!(matches!(parsed, ServerMessage::Pong { timestamp: 42 }));
    }
}

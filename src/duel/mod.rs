//! Head-to-head duels.
//!
//! Both players run the same seeded rounds on their own clocks; the shared
//! record only carries lobby state and per-side score snapshots, so a duel
//! needs no tick synchronization between the two sides.

pub mod coordinator;
pub mod session;
pub mod store;

pub use coordinator::{DuelCoordinator, FinishedDuel, LeaveEffect};
pub use session::{BestOf, DuelRole, DuelSession, DuelStatus, PlayerStats};
pub use store::MemoryDuelStore;

/// Duel operation failures. Messages are short and user-facing; the server
/// forwards them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DuelError {
    /// No record under that code.
    #[error("game not found")]
    NotFound,

    /// Guest slot already taken, or the lobby is no longer joinable.
    #[error("lobby full")]
    LobbyFull,

    /// Joining your own lobby.
    #[error("cannot join your own game")]
    SelfJoin,

    /// Caller is neither seat of the duel.
    #[error("not in this game")]
    NotInDuel,

    /// Host-only operation attempted from the guest seat.
    #[error("only the host can do that")]
    NotHost,

    /// Start attempted without an opponent.
    #[error("waiting for an opponent")]
    NotReady,

    /// Operation invalid for the record's current status.
    #[error("game already started")]
    AlreadyStarted,

    /// Finish attempted while the record was still in the lobby.
    #[error("game not started")]
    NotStarted,

    /// Start attempted before the external escrow was funded.
    #[error("wager not funded")]
    WagerUnfunded,

    /// Fresh-code generation kept colliding.
    #[error("could not allocate a game code")]
    CodeExhausted,
}

//! # Trench Trainer Server
//!
//! Server for a signal-reading reaction game: a post in a fake social feed
//! names a target token, the player has to pick it out of a board of
//! same-theme decoys, traps, and noise. Solo sessions are rated on an
//! absolute curve; head-to-head duels run identical seeded rounds and are
//! rated Elo-style.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  TRENCH TRAINER SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Seeded Lehmer LCG, seed/code derivation   │
//! │                                                              │
//! │  content/        - Theme/decoy/noise dataset + validation    │
//! │                                                              │
//! │  game/           - Gameplay (deterministic where seeded)     │
//! │  ├── round.rs    - Difficulty curve and round generation     │
//! │  └── session.rs  - Arm/live/cooldown state machine           │
//! │                                                              │
//! │  rating/         - Practice curve and duel Elo               │
//! │  duel/           - Lobby codes, shared records, CAS join     │
//! │  storage/        - Player records and match history          │
//! │                                                              │
//! │  network/        - WebSocket transport                       │
//! │  ├── protocol.rs - Tagged JSON messages (redacted payloads)  │
//! │  └── server.rs   - Accept loop and per-connection driver     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fairness Guarantees
//!
//! - Round structure is a pure function of `(seed, round_index)`: both
//!   duel sides generate identical boards with no coordination.
//! - The server clock measures every reaction; client timestamps are
//!   never trusted.
//! - Wire payloads carry no item kinds: the correct answer is only
//!   revealed after the round resolves.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod content;
pub mod core;
pub mod duel;
pub mod game;
pub mod network;
pub mod rating;
pub mod storage;

// Re-export commonly used types
pub use content::ContentSet;
pub use core::rng::SeededRng;
pub use duel::DuelCoordinator;
pub use game::round::{Round, RoundGenerator};
pub use game::session::{EngineConfig, SessionEngine};
pub use network::server::{GameServer, ServerConfig};
pub use storage::PlayerStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

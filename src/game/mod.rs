//! Gameplay: deterministic round generation and the per-player session
//! state machine that runs rounds against a millisecond clock.

pub mod round;
pub mod session;

pub use round::{Item, ItemKind, Round, RoundGenerator};
pub use session::{EngineConfig, Phase, RoundOutcome, SessionEngine, SessionEvent, SessionStats};

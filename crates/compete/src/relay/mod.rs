pub mod clock;
pub mod engine;
pub mod error;
pub mod game;
pub mod protocol;
pub mod types;

pub use clock::ClockPair;
pub use engine::{EngineHandle, EngineSpec, LineEndpoint};
pub use error::{EngineError, EngineResult, SpecError};
pub use game::{GameConfig, GameResult, GameSession, MoveEvent, Relay, SessionState};
pub use protocol::{classify_line, InboundLine};
pub use types::{EndReason, GameOutcome, Side, DRAW_LABEL, NO_RESULT_LABEL};

pub mod bite;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod pending;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod store;

pub use bite::EdgeTracker;
pub use config::EngineConfig;
pub use connection::Backoff;
pub use dispatch::PlayerIntent;
pub use engine::FishingClient;
pub use error::{ActionError, EngineError};
pub use event::{BreakKind, EngineEvent};
pub use pending::{PendingCommands, PendingKey};
pub use protocol::{
    ActionKind, CatchState, CaughtData, ClientAction, FightData, FightResult, GameTime,
    MAX_SESSIONS, RodClass, RodId, ServerFrame, SessionData, SessionId, StateSnapshot, StrikeData,
    TimePhase,
};
pub use rest::StatusApi;
pub use store::{CaughtInfo, FightInfo, HookedFish, RodSession, SessionStore};

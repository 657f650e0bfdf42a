use crate::protocol::{ActionKind, CaughtData, SessionId, StrikeData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    LineBreak,
    RodBreak,
}

/// Edge-triggered notifications emitted by the engine loop. Continuous
/// state lives on the watch channel; these fire once per occurrence.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Connected,
    Disconnected,
    NibbleStarted {
        session_id: SessionId,
    },
    BiteStarted {
        session_id: SessionId,
    },
    CastAccepted {
        session_id: SessionId,
        slot: u8,
    },
    Hooked(StrikeData),
    Caught(CaughtData),
    FightLost {
        session_id: SessionId,
        kind: BreakKind,
    },
    Kept(serde_json::Map<String, serde_json::Value>),
    Released {
        karma_bonus: f64,
        karma_total: f64,
    },
    RodRetrieved {
        session_id: SessionId,
    },
    BaitChanged {
        session_id: SessionId,
        new_bait: String,
        bait_remaining: i64,
    },
    /// Server rejection or local precondition failure; a transient,
    /// dismissible message with no retry.
    CommandRejected {
        message: String,
    },
    CommandTimedOut {
        kind: ActionKind,
        session_id: Option<SessionId>,
    },
}

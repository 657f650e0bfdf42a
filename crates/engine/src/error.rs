use crate::protocol::{RodId, SessionId};

/// Client-side precondition failures. These never reach the network;
/// they surface on the same transient message channel as server
/// rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("rod {rod_id} is already cast")]
    RodAlreadyCast { rod_id: RodId },
    #[error("at most {max} rods can be in the water")]
    RodLimitReached { max: usize },
    #[error("no such session: {session_id}")]
    UnknownSession { session_id: SessionId },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("frame encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("engine is shut down")]
    Stopped,
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type SessionId = i64;
pub type RodId = i64;

pub const MAX_SESSIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchState {
    Idle,
    Waiting,
    Nibble,
    Bite,
    Fighting,
    Caught,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RodClass {
    Float,
    Spinning,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePhase {
    Morning,
    Day,
    Evening,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameTime {
    pub hour: u8,
    pub day: u32,
    pub time_of_day: TimePhase,
}

/// One session record as serialized by the server. Any field the server
/// may omit on older sessions gets a default instead of failing the
/// whole frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub id: SessionId,
    pub state: CatchState,
    pub slot: u8,
    pub rod_id: RodId,
    #[serde(default)]
    pub rod_name: String,
    pub rod_class: RodClass,
    #[serde(default)]
    pub retrieve_speed: f32,
    #[serde(default)]
    pub is_retrieving: bool,
    #[serde(default)]
    pub retrieve_progress: f32,
    pub cast_x: f32,
    pub cast_y: f32,
    #[serde(default)]
    pub hooked_species_name: Option<String>,
    #[serde(default)]
    pub hooked_species_image: Option<String>,
    #[serde(default)]
    pub hooked_weight: Option<f64>,
    #[serde(default)]
    pub hooked_length: Option<f64>,
    #[serde(default)]
    pub hooked_rarity: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FightData {
    pub session_id: SessionId,
    pub line_tension: f32,
    pub distance: f32,
    pub rod_durability: f32,
    #[serde(default)]
    pub fish_strength: f32,
}

/// Full authoritative replacement of all session state. The same shape
/// arrives both as a `state` websocket frame and from the REST status
/// endpoint. Fight entries are keyed by stringified session id on the
/// wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub sessions: Vec<SessionData>,
    #[serde(default)]
    pub fights: HashMap<String, FightData>,
    #[serde(default)]
    pub game_time: Option<GameTime>,
    #[serde(default)]
    pub bites: Option<Vec<SessionId>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrikeData {
    pub session_id: SessionId,
    pub fish: String,
    #[serde(default)]
    pub species_id: i64,
    #[serde(default)]
    pub species_image: Option<String>,
    #[serde(default)]
    pub tension: f32,
    #[serde(default)]
    pub distance: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaughtData {
    pub session_id: SessionId,
    pub fish: String,
    #[serde(default)]
    pub species_id: i64,
    #[serde(default)]
    pub species_image: Option<String>,
    pub weight: f64,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub rarity: String,
}

/// Outcome of a `reel_in`/`pull` command. `Fighting` is informational
/// progress only; the next `state` frame carries the durable truth.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FightResult {
    Caught(CaughtData),
    LineBreak {
        session_id: SessionId,
    },
    RodBreak {
        session_id: SessionId,
    },
    Fighting {
        session_id: SessionId,
        #[serde(default)]
        tension: f32,
        #[serde(default)]
        distance: f32,
        #[serde(default)]
        rod_durability: f32,
    },
}

/// Every inbound frame the server can push, discriminated by the
/// `type` field. Unrecognized discriminants fail to decode and are
/// dropped by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    State(StateSnapshot),
    CastOk {
        session_id: SessionId,
        slot: u8,
    },
    StrikeOk(StrikeData),
    FightResult(FightResult),
    KeepResult(serde_json::Map<String, serde_json::Value>),
    ReleaseResult {
        karma_bonus: f64,
        karma_total: f64,
    },
    RetrieveOk {
        session_id: SessionId,
    },
    UpdateRetrieveOk {
        session_id: SessionId,
        is_retrieving: bool,
    },
    ChangeBaitOk {
        session_id: SessionId,
        new_bait: String,
        bait_remaining: i64,
    },
    Error {
        message: String,
    },
}

/// Outgoing command frames, discriminated by the `action` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    Cast {
        rod_id: RodId,
        point_x: f32,
        point_y: f32,
    },
    Strike {
        session_id: SessionId,
    },
    ReelIn {
        session_id: SessionId,
    },
    Pull {
        session_id: SessionId,
    },
    Keep {
        session_id: SessionId,
    },
    Release {
        session_id: SessionId,
    },
    Retrieve {
        session_id: SessionId,
    },
    UpdateRetrieve {
        session_id: SessionId,
        is_retrieving: bool,
    },
    ChangeBait {
        session_id: SessionId,
        bait_id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Cast,
    Strike,
    ReelIn,
    Pull,
    Keep,
    Release,
    Retrieve,
    UpdateRetrieve,
    ChangeBait,
}

impl ClientAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            ClientAction::Cast { .. } => ActionKind::Cast,
            ClientAction::Strike { .. } => ActionKind::Strike,
            ClientAction::ReelIn { .. } => ActionKind::ReelIn,
            ClientAction::Pull { .. } => ActionKind::Pull,
            ClientAction::Keep { .. } => ActionKind::Keep,
            ClientAction::Release { .. } => ActionKind::Release,
            ClientAction::Retrieve { .. } => ActionKind::Retrieve,
            ClientAction::UpdateRetrieve { .. } => ActionKind::UpdateRetrieve,
            ClientAction::ChangeBait { .. } => ActionKind::ChangeBait,
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            ClientAction::Cast { .. } => None,
            ClientAction::Strike { session_id }
            | ClientAction::ReelIn { session_id }
            | ClientAction::Pull { session_id }
            | ClientAction::Keep { session_id }
            | ClientAction::Release { session_id }
            | ClientAction::Retrieve { session_id }
            | ClientAction::UpdateRetrieve { session_id, .. }
            | ClientAction::ChangeBait { session_id, .. } => Some(*session_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_encoding() {
        let action = ClientAction::Cast {
            rod_id: 7,
            point_x: 40.0,
            point_y: 60.0,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&action).unwrap()).unwrap();
        assert_eq!(json["action"], "cast");
        assert_eq!(json["rod_id"], 7);
        assert_eq!(json["point_x"], 40.0);

        let toggle = ClientAction::UpdateRetrieve {
            session_id: 101,
            is_retrieving: true,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&toggle).unwrap()).unwrap();
        assert_eq!(json["action"], "update_retrieve");
        assert_eq!(json["is_retrieving"], true);
    }

    #[test]
    fn test_state_frame_decoding() {
        let raw = r#"{
            "type": "state",
            "sessions": [{
                "id": 101, "state": "waiting", "slot": 1, "rod_id": 7,
                "rod_name": "Birch rod", "rod_class": "float",
                "retrieve_speed": 1.0, "is_retrieving": false,
                "retrieve_progress": 0.0, "cast_x": 40.0, "cast_y": 60.0,
                "hooked_species_name": null, "hooked_weight": null
            }],
            "fights": {},
            "game_time": {"hour": 6, "day": 3, "time_of_day": "morning"},
            "bites": [101]
        }"#;
        let frame: ServerFrame = serde_json::from_str(raw).unwrap();
        let ServerFrame::State(snap) = frame else {
            panic!("expected state frame");
        };
        assert_eq!(snap.sessions.len(), 1);
        assert_eq!(snap.sessions[0].state, CatchState::Waiting);
        assert_eq!(snap.sessions[0].rod_class, RodClass::Float);
        assert_eq!(snap.game_time.unwrap().time_of_day, TimePhase::Morning);
        assert_eq!(snap.bites.as_deref(), Some(&[101][..]));
    }

    #[test]
    fn test_fight_result_decoding() {
        let raw = r#"{
            "type": "fight_result", "result": "caught",
            "session_id": 101, "fish": "Perch", "species_id": 4,
            "species_image": null, "weight": 1.2, "length": 24.0,
            "rarity": "common"
        }"#;
        let frame: ServerFrame = serde_json::from_str(raw).unwrap();
        match frame {
            ServerFrame::FightResult(FightResult::Caught(data)) => {
                assert_eq!(data.session_id, 101);
                assert_eq!(data.fish, "Perch");
                assert!((data.weight - 1.2).abs() < f64::EPSILON);
            }
            other => panic!("unexpected frame: {:?}", other),
        }

        let raw = r#"{"type": "fight_result", "result": "line_break", "session_id": 101}"#;
        let frame: ServerFrame = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            frame,
            ServerFrame::FightResult(FightResult::LineBreak { session_id: 101 })
        ));
    }

    #[test]
    fn test_unknown_discriminant_is_an_error() {
        let raw = r#"{"type": "groundbait_ok", "message": "done"}"#;
        assert!(serde_json::from_str::<ServerFrame>(raw).is_err());

        let raw = r#"{"type": "state", "sessions": "not-an-array"}"#;
        assert!(serde_json::from_str::<ServerFrame>(raw).is_err());
    }

    #[test]
    fn test_fights_keyed_by_string_id() {
        let raw = r#"{
            "type": "state",
            "sessions": [],
            "fights": {"101": {
                "session_id": 101, "line_tension": 55.0,
                "distance": 12.5, "rod_durability": 90.0,
                "fish_strength": 4.0
            }}
        }"#;
        let ServerFrame::State(snap) = serde_json::from_str(raw).unwrap() else {
            panic!("expected state frame");
        };
        assert_eq!(snap.fights["101"].session_id, 101);
        assert!((snap.fights["101"].line_tension - 55.0).abs() < f32::EPSILON);
    }
}

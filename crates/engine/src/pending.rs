use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::protocol::{ActionKind, ClientAction, FightResult, ServerFrame, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingKey {
    pub kind: ActionKind,
    pub session_id: Option<SessionId>,
}

/// Correlation table for in-flight commands. The wire carries no
/// request ids, so entries are keyed by (action kind, session id) and
/// cleared by the matching acknowledgment; an `error` frame clears the
/// whole table since a rejection cannot be attributed. Entries that
/// outlive the timeout are reported by `sweep`.
#[derive(Debug)]
pub struct PendingCommands {
    entries: HashMap<PendingKey, Instant>,
    timeout: Duration,
}

impl PendingCommands {
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            timeout,
        }
    }

    pub fn record(&mut self, action: &ClientAction) {
        let key = PendingKey {
            kind: action.kind(),
            session_id: action.session_id(),
        };
        self.entries.insert(key, Instant::now() + self.timeout);
    }

    pub fn acknowledge(&mut self, frame: &ServerFrame) {
        match frame {
            ServerFrame::CastOk { .. } => self.clear_kind(ActionKind::Cast),
            ServerFrame::StrikeOk(data) => {
                self.clear_entry(ActionKind::Strike, Some(data.session_id));
            }
            ServerFrame::FightResult(result) => {
                let session_id = match result {
                    FightResult::Caught(data) => data.session_id,
                    FightResult::LineBreak { session_id }
                    | FightResult::RodBreak { session_id }
                    | FightResult::Fighting { session_id, .. } => *session_id,
                };
                // A fight result answers either reel_in or pull.
                self.clear_entry(ActionKind::ReelIn, Some(session_id));
                self.clear_entry(ActionKind::Pull, Some(session_id));
            }
            ServerFrame::KeepResult(_) => self.clear_kind(ActionKind::Keep),
            ServerFrame::ReleaseResult { .. } => self.clear_kind(ActionKind::Release),
            ServerFrame::RetrieveOk { session_id } => {
                self.clear_entry(ActionKind::Retrieve, Some(*session_id));
            }
            ServerFrame::UpdateRetrieveOk { session_id, .. } => {
                self.clear_entry(ActionKind::UpdateRetrieve, Some(*session_id));
            }
            ServerFrame::ChangeBaitOk { session_id, .. } => {
                self.clear_entry(ActionKind::ChangeBait, Some(*session_id));
            }
            ServerFrame::Error { .. } => self.entries.clear(),
            ServerFrame::State(_) => {}
        }
    }

    /// Remove and return every entry whose deadline has passed.
    pub fn sweep(&mut self, now: Instant) -> Vec<PendingKey> {
        let expired: Vec<PendingKey> = self
            .entries
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Forget every in-flight command, as on a full local reset.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear_entry(&mut self, kind: ActionKind, session_id: Option<SessionId>) {
        self.entries.remove(&PendingKey { kind, session_id });
    }

    fn clear_kind(&mut self, kind: ActionKind) {
        self.entries.retain(|key, _| key.kind != kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_clears_matching_entry() {
        let mut pending = PendingCommands::new(Duration::from_secs(10));
        pending.record(&ClientAction::Strike { session_id: 101 });
        pending.record(&ClientAction::Strike { session_id: 102 });

        let frame: ServerFrame = serde_json::from_str(
            r#"{"type": "strike_ok", "session_id": 101, "fish": "Perch",
                "species_id": 4, "tension": 40.0, "distance": 15.0}"#,
        )
        .unwrap();
        pending.acknowledge(&frame);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_cast_ack_clears_without_session_id() {
        let mut pending = PendingCommands::new(Duration::from_secs(10));
        pending.record(&ClientAction::Cast {
            rod_id: 7,
            point_x: 1.0,
            point_y: 1.0,
        });
        let frame: ServerFrame =
            serde_json::from_str(r#"{"type": "cast_ok", "session_id": 101, "slot": 1}"#).unwrap();
        pending.acknowledge(&frame);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_fight_result_clears_both_fight_actions() {
        let mut pending = PendingCommands::new(Duration::from_secs(10));
        pending.record(&ClientAction::ReelIn { session_id: 101 });
        pending.record(&ClientAction::Pull { session_id: 101 });
        let frame: ServerFrame = serde_json::from_str(
            r#"{"type": "fight_result", "result": "line_break", "session_id": 101}"#,
        )
        .unwrap();
        pending.acknowledge(&frame);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_error_clears_everything() {
        let mut pending = PendingCommands::new(Duration::from_secs(10));
        pending.record(&ClientAction::Keep { session_id: 101 });
        pending.record(&ClientAction::Retrieve { session_id: 102 });
        let frame: ServerFrame =
            serde_json::from_str(r#"{"type": "error", "message": "nope"}"#).unwrap();
        pending.acknowledge(&frame);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_sweep_expires_only_overdue_entries() {
        let mut pending = PendingCommands::new(Duration::from_millis(0));
        pending.record(&ClientAction::Keep { session_id: 101 });
        let expired = pending.sweep(Instant::now() + Duration::from_millis(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].kind, ActionKind::Keep);
        assert!(pending.is_empty());

        let mut pending = PendingCommands::new(Duration::from_secs(60));
        pending.record(&ClientAction::Keep { session_id: 101 });
        assert!(pending.sweep(Instant::now()).is_empty());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_clear_forgets_in_flight_commands() {
        let mut pending = PendingCommands::new(Duration::from_millis(0));
        pending.record(&ClientAction::Strike { session_id: 101 });
        pending.record(&ClientAction::Keep { session_id: 102 });
        pending.clear();
        assert!(pending.is_empty());
        assert!(pending.sweep(Instant::now() + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_state_frame_is_not_an_ack() {
        let mut pending = PendingCommands::new(Duration::from_secs(10));
        pending.record(&ClientAction::Strike { session_id: 101 });
        let frame: ServerFrame =
            serde_json::from_str(r#"{"type": "state", "sessions": [], "fights": {}}"#).unwrap();
        pending.acknowledge(&frame);
        assert_eq!(pending.len(), 1);
    }
}

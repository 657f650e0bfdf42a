use crate::error::ActionError;
use crate::protocol::{ClientAction, RodId, SessionId, MAX_SESSIONS};
use crate::store::SessionStore;

/// A player intent as expressed by the presentation layer. Each maps
/// to one outgoing command after local precondition checks.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerIntent {
    Cast { rod_id: RodId, x: f32, y: f32 },
    Strike { session_id: SessionId },
    ReelIn { session_id: SessionId },
    Pull { session_id: SessionId },
    Keep { session_id: SessionId },
    Release { session_id: SessionId },
    Retrieve { session_id: SessionId },
    UpdateRetrieve { session_id: SessionId, is_retrieving: bool },
    ChangeBait { session_id: SessionId, bait_id: i64 },
}

/// Validate an intent against the current store and produce the frame
/// to send. Obviously-invalid actions are rejected here, before any
/// round trip. `update_retrieve` additionally patches the store
/// optimistically; the next snapshot overwrites whatever it set.
pub fn prepare(
    intent: PlayerIntent,
    store: &mut SessionStore,
) -> Result<ClientAction, ActionError> {
    match intent {
        PlayerIntent::Cast { rod_id, x, y } => {
            if store.session_for_rod(rod_id).is_some() {
                return Err(ActionError::RodAlreadyCast { rod_id });
            }
            if !store.can_cast() {
                return Err(ActionError::RodLimitReached { max: MAX_SESSIONS });
            }
            Ok(ClientAction::Cast {
                rod_id,
                point_x: x,
                point_y: y,
            })
        }
        PlayerIntent::Strike { session_id } => {
            require_session(store, session_id)?;
            Ok(ClientAction::Strike { session_id })
        }
        PlayerIntent::ReelIn { session_id } => {
            require_session(store, session_id)?;
            Ok(ClientAction::ReelIn { session_id })
        }
        PlayerIntent::Pull { session_id } => {
            require_session(store, session_id)?;
            Ok(ClientAction::Pull { session_id })
        }
        PlayerIntent::Keep { session_id } => {
            require_session(store, session_id)?;
            Ok(ClientAction::Keep { session_id })
        }
        PlayerIntent::Release { session_id } => {
            require_session(store, session_id)?;
            Ok(ClientAction::Release { session_id })
        }
        PlayerIntent::Retrieve { session_id } => {
            require_session(store, session_id)?;
            Ok(ClientAction::Retrieve { session_id })
        }
        PlayerIntent::UpdateRetrieve {
            session_id,
            is_retrieving,
        } => {
            require_session(store, session_id)?;
            store.patch_retrieve(session_id, is_retrieving);
            Ok(ClientAction::UpdateRetrieve {
                session_id,
                is_retrieving,
            })
        }
        PlayerIntent::ChangeBait {
            session_id,
            bait_id,
        } => {
            require_session(store, session_id)?;
            Ok(ClientAction::ChangeBait {
                session_id,
                bait_id,
            })
        }
    }
}

fn require_session(store: &SessionStore, session_id: SessionId) -> Result<(), ActionError> {
    if store.session(session_id).is_none() {
        return Err(ActionError::UnknownSession { session_id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CatchState, RodClass, SessionData, StateSnapshot};

    fn store_with_sessions(specs: &[(SessionId, u8, RodId)]) -> SessionStore {
        let sessions = specs
            .iter()
            .map(|&(id, slot, rod_id)| SessionData {
                id,
                state: CatchState::Waiting,
                slot,
                rod_id,
                rod_name: String::new(),
                rod_class: RodClass::Float,
                retrieve_speed: 1.0,
                is_retrieving: false,
                retrieve_progress: 0.0,
                cast_x: 0.0,
                cast_y: 0.0,
                hooked_species_name: None,
                hooked_species_image: None,
                hooked_weight: None,
                hooked_length: None,
                hooked_rarity: None,
            })
            .collect();
        let mut store = SessionStore::new();
        store.apply_snapshot(&StateSnapshot {
            sessions,
            ..Default::default()
        });
        store
    }

    #[test]
    fn test_cast_rejected_for_busy_rod() {
        let mut store = store_with_sessions(&[(101, 1, 7)]);
        let err = prepare(
            PlayerIntent::Cast {
                rod_id: 7,
                x: 10.0,
                y: 10.0,
            },
            &mut store,
        )
        .unwrap_err();
        assert_eq!(err, ActionError::RodAlreadyCast { rod_id: 7 });
    }

    #[test]
    fn test_cast_rejected_past_rod_limit() {
        let mut store = store_with_sessions(&[(101, 1, 7), (102, 2, 8), (103, 3, 9)]);
        let err = prepare(
            PlayerIntent::Cast {
                rod_id: 10,
                x: 10.0,
                y: 10.0,
            },
            &mut store,
        )
        .unwrap_err();
        assert_eq!(err, ActionError::RodLimitReached { max: 3 });
    }

    #[test]
    fn test_cast_produces_frame_without_local_session() {
        let mut store = store_with_sessions(&[(101, 1, 7)]);
        let action = prepare(
            PlayerIntent::Cast {
                rod_id: 8,
                x: 40.0,
                y: 60.0,
            },
            &mut store,
        )
        .unwrap();
        assert_eq!(
            action,
            ClientAction::Cast {
                rod_id: 8,
                point_x: 40.0,
                point_y: 60.0,
            }
        );
        // No session is created locally; only a snapshot does that.
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_unknown_session_short_circuits() {
        let mut store = store_with_sessions(&[]);
        let err = prepare(PlayerIntent::Strike { session_id: 42 }, &mut store).unwrap_err();
        assert_eq!(err, ActionError::UnknownSession { session_id: 42 });
    }

    #[test]
    fn test_update_retrieve_patches_store_before_send() {
        let mut store = store_with_sessions(&[(101, 1, 7)]);
        let action = prepare(
            PlayerIntent::UpdateRetrieve {
                session_id: 101,
                is_retrieving: true,
            },
            &mut store,
        )
        .unwrap();
        assert_eq!(
            action,
            ClientAction::UpdateRetrieve {
                session_id: 101,
                is_retrieving: true,
            }
        );
        let session = store.session(101).unwrap();
        assert!(session.is_retrieving);
        assert!(session.retrieve_pending);
    }
}

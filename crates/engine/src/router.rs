use crate::bite::EdgeTracker;
use crate::event::{BreakKind, EngineEvent};
use crate::protocol::{CatchState, FightResult, ServerFrame, StateSnapshot};
use crate::store::{CaughtInfo, SessionStore};

/// Decode an inbound text frame, or drop it. Malformed payloads and
/// unknown discriminants are logged at debug level; the stream keeps
/// flowing.
pub fn decode(raw: &str) -> Option<ServerFrame> {
    match serde_json::from_str::<ServerFrame>(raw) {
        Ok(frame) => Some(frame),
        Err(err) => {
            log::debug!("dropping unrecognized frame ({}): {}", err, raw);
            None
        }
    }
}

/// Apply one inbound frame to the store and derive the edge-triggered
/// events it implies. This is the only inbound write path to the
/// store.
pub fn route(
    frame: ServerFrame,
    store: &mut SessionStore,
    bites: &mut EdgeTracker,
    nibbles: &mut EdgeTracker,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    match frame {
        ServerFrame::State(snapshot) => {
            apply_state(&snapshot, store, bites, nibbles, &mut events);
        }
        ServerFrame::CastOk { session_id, slot } => {
            events.push(EngineEvent::CastAccepted { session_id, slot });
        }
        ServerFrame::StrikeOk(data) => {
            events.push(EngineEvent::Hooked(data));
        }
        ServerFrame::FightResult(result) => match result {
            FightResult::Caught(data) => {
                store.set_caught(Some(CaughtInfo {
                    session_id: data.session_id,
                    fish: data.fish.clone(),
                    species_image: data.species_image.clone(),
                    weight: data.weight,
                    length: data.length,
                    rarity: data.rarity.clone(),
                }));
                events.push(EngineEvent::Caught(data));
            }
            FightResult::LineBreak { session_id } => {
                events.push(EngineEvent::FightLost {
                    session_id,
                    kind: BreakKind::LineBreak,
                });
            }
            FightResult::RodBreak { session_id } => {
                events.push(EngineEvent::FightLost {
                    session_id,
                    kind: BreakKind::RodBreak,
                });
            }
            FightResult::Fighting { session_id, .. } => {
                // Progress report only; the next snapshot is the truth.
                log::debug!("fight continues on session {}", session_id);
            }
        },
        ServerFrame::KeepResult(data) => {
            clear_caught_session(store);
            events.push(EngineEvent::Kept(data));
        }
        ServerFrame::ReleaseResult {
            karma_bonus,
            karma_total,
        } => {
            clear_caught_session(store);
            events.push(EngineEvent::Released {
                karma_bonus,
                karma_total,
            });
        }
        ServerFrame::RetrieveOk { session_id } => {
            store.remove_session(session_id);
            events.push(EngineEvent::RodRetrieved { session_id });
        }
        ServerFrame::UpdateRetrieveOk {
            session_id,
            is_retrieving,
        } => {
            store.confirm_retrieve(session_id, is_retrieving);
        }
        ServerFrame::ChangeBaitOk {
            session_id,
            new_bait,
            bait_remaining,
        } => {
            events.push(EngineEvent::BaitChanged {
                session_id,
                new_bait,
                bait_remaining,
            });
        }
        ServerFrame::Error { message } => {
            events.push(EngineEvent::CommandRejected { message });
        }
    }
    events
}

fn apply_state(
    snapshot: &StateSnapshot,
    store: &mut SessionStore,
    bites: &mut EdgeTracker,
    nibbles: &mut EdgeTracker,
    events: &mut Vec<EngineEvent>,
) {
    store.apply_snapshot(snapshot);

    // Reconnect can land mid-decision: a session still in `caught`
    // with no overlay means the overlay was lost, so rebuild it from
    // the hooked-fish fields.
    if store.caught_info().is_none() {
        if let Some(session) = store.first_in(CatchState::Caught) {
            let hooked = session.hooked.clone();
            let info = CaughtInfo {
                session_id: session.id,
                fish: hooked
                    .as_ref()
                    .map(|h| h.species_name.clone())
                    .unwrap_or_else(|| "fish".to_string()),
                species_image: hooked.as_ref().and_then(|h| h.species_image.clone()),
                weight: hooked.as_ref().map(|h| h.weight).unwrap_or(0.0),
                length: hooked.as_ref().map(|h| h.length).unwrap_or(0.0),
                rarity: hooked
                    .map(|h| h.rarity)
                    .unwrap_or_else(|| "common".to_string()),
            };
            store.set_caught(Some(info));
        }
    }

    // The server may name the biting sessions explicitly; otherwise
    // derive them from the states.
    let bite_ids = match &snapshot.bites {
        Some(ids) => ids.iter().copied().collect(),
        None => store.ids_in(CatchState::Bite),
    };
    for session_id in bites.observe(bite_ids) {
        events.push(EngineEvent::BiteStarted { session_id });
    }
    for session_id in nibbles.observe(store.ids_in(CatchState::Nibble)) {
        events.push(EngineEvent::NibbleStarted { session_id });
    }
}

fn clear_caught_session(store: &mut SessionStore) {
    if let Some(info) = store.caught_info() {
        let session_id = info.session_id;
        store.remove_session(session_id);
    }
    store.set_caught(None);
}

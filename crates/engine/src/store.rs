use std::collections::BTreeMap;

use crate::protocol::{
    CatchState, FightData, GameTime, RodClass, RodId, SessionData, SessionId, StateSnapshot,
};

/// One rod committed to a catch attempt, mirrored from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RodSession {
    pub id: SessionId,
    pub state: CatchState,
    pub slot: u8,
    pub rod_id: RodId,
    pub rod_name: String,
    pub rod_class: RodClass,
    pub retrieve_speed: f32,
    pub is_retrieving: bool,
    /// Set while a locally-issued retrieve toggle has not been
    /// confirmed by the server. Any snapshot clears it.
    pub retrieve_pending: bool,
    pub retrieve_progress: f32,
    pub cast_x: f32,
    pub cast_y: f32,
    pub hooked: Option<HookedFish>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HookedFish {
    pub species_name: String,
    pub species_image: Option<String>,
    pub weight: f64,
    pub length: f64,
    pub rarity: String,
}

impl RodSession {
    fn from_data(data: &SessionData) -> Self {
        let hooked = data.hooked_species_name.as_ref().map(|name| HookedFish {
            species_name: name.clone(),
            species_image: data.hooked_species_image.clone(),
            weight: data.hooked_weight.unwrap_or(0.0),
            length: data.hooked_length.unwrap_or(0.0),
            rarity: data
                .hooked_rarity
                .clone()
                .unwrap_or_else(|| "common".to_string()),
        });
        Self {
            id: data.id,
            state: data.state,
            slot: data.slot,
            rod_id: data.rod_id,
            rod_name: data.rod_name.clone(),
            rod_class: data.rod_class,
            retrieve_speed: data.retrieve_speed,
            is_retrieving: data.is_retrieving,
            retrieve_pending: false,
            retrieve_progress: data.retrieve_progress,
            cast_x: data.cast_x,
            cast_y: data.cast_y,
            hooked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FightInfo {
    pub session_id: SessionId,
    pub tension: f32,
    pub distance: f32,
    pub rod_durability: f32,
    pub fish_strength: f32,
}

impl FightInfo {
    fn from_data(data: &FightData) -> Self {
        Self {
            session_id: data.session_id,
            tension: data.line_tension,
            distance: data.distance,
            rod_durability: data.rod_durability,
            fish_strength: data.fish_strength,
        }
    }
}

/// Fish pending a keep/release decision.
#[derive(Debug, Clone, PartialEq)]
pub struct CaughtInfo {
    pub session_id: SessionId,
    pub fish: String,
    pub species_image: Option<String>,
    pub weight: f64,
    pub length: f64,
    pub rarity: String,
}

/// In-memory mirror of all rod sessions. Snapshots replace the whole
/// map atomically so two sessions are never observed mid-update; the
/// active pointer is re-validated on every mutation and never dangles.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: BTreeMap<SessionId, RodSession>,
    fights: BTreeMap<SessionId, FightInfo>,
    active_session_id: Option<SessionId>,
    caught_info: Option<CaughtInfo>,
    game_time: Option<GameTime>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(&mut self, snapshot: &StateSnapshot) {
        let mut sessions = BTreeMap::new();
        for data in &snapshot.sessions {
            sessions.insert(data.id, RodSession::from_data(data));
        }

        let mut fights = BTreeMap::new();
        for (key, data) in &snapshot.fights {
            let Ok(id) = key.parse::<SessionId>() else {
                log::debug!("ignoring fight entry with non-numeric key {:?}", key);
                continue;
            };
            // FightInfo exists iff its session is fighting.
            if sessions.get(&id).map(|s| s.state) == Some(CatchState::Fighting) {
                fights.insert(id, FightInfo::from_data(data));
            }
        }

        let mut active = self.active_session_id;
        if let Some(id) = active {
            if !sessions.contains_key(&id) {
                active = None;
            }
        }
        if active.is_none() {
            active = snapshot.sessions.first().map(|s| s.id);
        }

        self.sessions = sessions;
        self.fights = fights;
        self.active_session_id = active;
        if let Some(gt) = snapshot.game_time {
            self.game_time = Some(gt);
        }
    }

    pub fn remove_session(&mut self, id: SessionId) {
        self.sessions.remove(&id);
        self.fights.remove(&id);
        if self.active_session_id == Some(id) {
            self.active_session_id = self
                .sessions
                .values()
                .min_by_key(|s| s.slot)
                .map(|s| s.id);
        }
    }

    pub fn reset(&mut self) {
        self.sessions.clear();
        self.fights.clear();
        self.active_session_id = None;
        self.caught_info = None;
    }

    pub fn set_active_session(&mut self, id: Option<SessionId>) {
        match id {
            Some(id) if self.sessions.contains_key(&id) => {
                self.active_session_id = Some(id);
            }
            Some(id) => {
                log::debug!("refusing to activate unknown session {}", id);
            }
            None => self.active_session_id = None,
        }
    }

    pub fn set_caught(&mut self, info: Option<CaughtInfo>) {
        self.caught_info = info;
    }

    pub fn set_game_time(&mut self, time: GameTime) {
        self.game_time = Some(time);
    }

    /// Local half of the optimistic retrieve toggle.
    pub fn patch_retrieve(&mut self, id: SessionId, is_retrieving: bool) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.is_retrieving = is_retrieving;
            session.retrieve_pending = true;
        }
    }

    /// Server confirmation of the retrieve toggle.
    pub fn confirm_retrieve(&mut self, id: SessionId, is_retrieving: bool) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.is_retrieving = is_retrieving;
            session.retrieve_pending = false;
        }
    }

    pub fn session(&self, id: SessionId) -> Option<&RodSession> {
        self.sessions.get(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &RodSession> {
        self.sessions.values()
    }

    pub fn session_for_rod(&self, rod_id: RodId) -> Option<&RodSession> {
        self.sessions.values().find(|s| s.rod_id == rod_id)
    }

    pub fn fight(&self, id: SessionId) -> Option<&FightInfo> {
        self.fights.get(&id)
    }

    pub fn fights(&self) -> impl Iterator<Item = &FightInfo> {
        self.fights.values()
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active_session_id
    }

    pub fn active_session(&self) -> Option<&RodSession> {
        self.active_session_id.and_then(|id| self.sessions.get(&id))
    }

    pub fn caught_info(&self) -> Option<&CaughtInfo> {
        self.caught_info.as_ref()
    }

    pub fn game_time(&self) -> Option<GameTime> {
        self.game_time
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn can_cast(&self) -> bool {
        self.sessions.len() < crate::protocol::MAX_SESSIONS
    }

    pub fn has_any_bite(&self) -> bool {
        self.sessions.values().any(|s| s.state == CatchState::Bite)
    }

    pub fn has_fighting(&self) -> bool {
        self.sessions
            .values()
            .any(|s| s.state == CatchState::Fighting)
    }

    pub fn ids_in(&self, state: CatchState) -> std::collections::BTreeSet<SessionId> {
        self.sessions
            .values()
            .filter(|s| s.state == state)
            .map(|s| s.id)
            .collect()
    }

    pub fn first_in(&self, state: CatchState) -> Option<&RodSession> {
        self.sessions.values().find(|s| s.state == state)
    }
}

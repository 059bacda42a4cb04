use std::collections::BTreeMap;

use crate::net::PlayerId;

use super::state::PlayerState;

/// Every known player, keyed by server-assigned id.
///
/// Absence from the registry means "not connected". Consumers only ever get
/// borrowed views; the registry owns all player state.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, PlayerState>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh player unless `id` is already present. An existing
    /// entry is left untouched so a duplicate CONNECT cannot roll back state
    /// advanced by later updates.
    pub fn insert_if_absent(&mut self, id: PlayerId, name: &str) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }
        self.players.insert(id, PlayerState::new(name));
        true
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<PlayerState> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &PlayerState)> {
        self.players.iter().map(|(&id, player)| (id, player))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerId, &mut PlayerState)> {
        self.players.iter_mut().map(|(&id, player)| (id, player))
    }
}

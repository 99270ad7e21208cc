//! Player registry.
//!
//! Owns every `PlayerRecord`, keyed by connection id. Callers go through
//! create/update/remove/snapshot; nobody else holds a record past removal.

use std::collections::BTreeMap;

use sandbox_shared::{color::Color, math::Vec3, net::ConnId, player::PlayerRecord};

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<ConnId, PlayerRecord>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record at the spawn position.
    ///
    /// Returns `None` and leaves the existing record untouched if `id` is
    /// already registered.
    pub fn create(
        &mut self,
        id: ConnId,
        name: impl Into<String>,
        color: Color,
    ) -> Option<PlayerRecord> {
        if self.players.contains_key(&id) {
            return None;
        }
        let rec = PlayerRecord::spawn(id.clone(), name, color);
        self.players.insert(id, rec.clone());
        Some(rec)
    }

    /// Moves a player. Returns false (and does nothing) for unknown ids.
    pub fn update_position(&mut self, id: &ConnId, position: Vec3) -> bool {
        match self.players.get_mut(id) {
            Some(rec) => {
                rec.position = position;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &ConnId) -> Option<PlayerRecord> {
        self.players.remove(id)
    }

    /// Point-in-time copy of every record.
    pub fn all(&self) -> BTreeMap<ConnId, PlayerRecord> {
        self.players.clone()
    }

    pub fn get(&self, id: &ConnId) -> Option<&PlayerRecord> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &ConnId) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }
}

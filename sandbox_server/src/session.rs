//! Session protocol handler.
//!
//! Binds the connection lifecycle (connect, name-set, move, disconnect) and the
//! clock tick to the registry and decides who hears about each change.
//!
//! Per-connection states: unnamed -> named -> gone. Events that arrive in the
//! wrong state (a move before the name, anything after disconnect, a second
//! name) are dropped without a reply.
//!
//! The handler never touches sockets. Every call returns the `Delivery` list
//! the transport has to fan out, in order.

use std::collections::HashMap;

use rand::{rngs::StdRng, SeedableRng};
use sandbox_shared::{
    clock::WorldClock,
    color::next_color_with,
    math::Vec3,
    net::{ClientMsg, ConnId, PlayerMoved, ServerMsg},
};
use tracing::{debug, info};

use crate::registry::PlayerRegistry;

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// A single connection.
    One(ConnId),
    /// Every connection except the one that caused the event.
    AllExcept(ConnId),
    /// Every connection.
    All,
}

impl Recipients {
    pub fn includes(&self, id: &ConnId) -> bool {
        match self {
            Recipients::One(target) => target == id,
            Recipients::AllExcept(sender) => sender != id,
            Recipients::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: Recipients,
    pub msg: ServerMsg,
}

impl Delivery {
    fn one(id: &ConnId, msg: ServerMsg) -> Self {
        Self {
            to: Recipients::One(id.clone()),
            msg,
        }
    }

    fn all_except(id: &ConnId, msg: ServerMsg) -> Self {
        Self {
            to: Recipients::AllExcept(id.clone()),
            msg,
        }
    }

    fn all(msg: ServerMsg) -> Self {
        Self {
            to: Recipients::All,
            msg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unnamed,
    Named,
}

/// Counts reported by `status`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStatus {
    pub connections: usize,
    pub players: usize,
    pub clock: f64,
}

pub struct SessionHandler {
    registry: PlayerRegistry,
    clock: WorldClock,
    sessions: HashMap<ConnId, SessionState>,
    rng: StdRng,
}

impl SessionHandler {
    pub fn new(clock: WorldClock) -> Self {
        Self::with_rng(clock, StdRng::from_entropy())
    }

    /// Uses the given random source for color picks.
    pub fn with_rng(clock: WorldClock, rng: StdRng) -> Self {
        Self {
            registry: PlayerRegistry::new(),
            clock,
            sessions: HashMap::new(),
            rng,
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &WorldClock {
        &self.clock
    }

    pub fn state(&self, id: &ConnId) -> Option<SessionState> {
        self.sessions.get(id).copied()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            connections: self.sessions.len(),
            players: self.registry.len(),
            clock: self.clock.value(),
        }
    }

    /// A connection was established.
    pub fn connect(&mut self, id: &ConnId) -> Vec<Delivery> {
        if self.sessions.contains_key(id) {
            debug!(conn = %id, "Duplicate connect ignored");
            return Vec::new();
        }
        self.sessions.insert(id.clone(), SessionState::Unnamed);
        debug!(conn = %id, "Connection opened");

        vec![
            Delivery::one(id, ServerMsg::Welcome { id: id.clone() }),
            Delivery::one(id, ServerMsg::TimeUpdate(self.clock.value())),
        ]
    }

    /// Dispatches one client message.
    pub fn handle(&mut self, id: &ConnId, msg: ClientMsg) -> Vec<Delivery> {
        match msg {
            ClientMsg::SetName(name) => self.set_name(id, name),
            ClientMsg::Move(position) => self.move_player(id, position),
        }
    }

    fn set_name(&mut self, id: &ConnId, name: String) -> Vec<Delivery> {
        match self.sessions.get(id) {
            Some(SessionState::Unnamed) => {}
            Some(SessionState::Named) => {
                debug!(conn = %id, "setName after naming ignored");
                return Vec::new();
            }
            None => {
                debug!(conn = %id, "setName from unknown connection ignored");
                return Vec::new();
            }
        }

        // Everyone who was here before this player.
        let others = self.registry.all();
        let color = next_color_with(&mut self.rng);
        let Some(rec) = self.registry.create(id.clone(), name, color) else {
            return Vec::new();
        };
        self.sessions.insert(id.clone(), SessionState::Named);
        info!(conn = %id, name = %rec.name, players = self.registry.len(), "Player joined");

        vec![
            Delivery::one(id, ServerMsg::CurrentPlayers(others)),
            Delivery::all_except(id, ServerMsg::PlayerJoined(rec)),
        ]
    }

    fn move_player(&mut self, id: &ConnId, position: Vec3) -> Vec<Delivery> {
        // JSON has no NaN or infinity literals.
        debug_assert!(position.is_finite());
        if self.sessions.get(id) != Some(&SessionState::Named)
            || !self.registry.update_position(id, position)
        {
            debug!(conn = %id, "move from unnamed or closed connection ignored");
            return Vec::new();
        }

        vec![Delivery::all_except(
            id,
            ServerMsg::PlayerMoved(PlayerMoved {
                id: id.clone(),
                position,
            }),
        )]
    }

    /// The connection is gone. Its events are no-ops from here on.
    pub fn disconnect(&mut self, id: &ConnId) -> Vec<Delivery> {
        if self.sessions.remove(id).is_none() {
            return Vec::new();
        }
        match self.registry.remove(id) {
            Some(rec) => {
                info!(conn = %id, name = %rec.name, players = self.registry.len(), "Player left");
                vec![Delivery::all_except(id, ServerMsg::PlayerLeft(id.clone()))]
            }
            None => {
                debug!(conn = %id, "Unnamed connection closed");
                Vec::new()
            }
        }
    }

    /// Advances the world clock one tick and broadcasts the new value.
    pub fn tick(&mut self) -> Vec<Delivery> {
        let t = self.clock.advance();
        vec![Delivery::all(ServerMsg::TimeUpdate(t))]
    }
}

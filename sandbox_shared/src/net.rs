//! Wire protocol.
//!
//! Every message is one WebSocket text frame carrying a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`. Client and server messages are two
//! closed enums so both ends match every event kind exhaustively.

use std::{
    collections::BTreeMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{math::Vec3, player::PlayerRecord};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one live connection. Opaque to clients.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(pub String);

impl ConnId {
    /// Allocates an id that is never handed out again by this process.
    pub fn new_unique() -> Self {
        ConnId(format!("conn-{}", NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnId {
    fn from(s: &str) -> Self {
        ConnId(s.to_string())
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client -> server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Display name, sent once after connecting.
    SetName(String),
    /// Latest local position.
    Move(Vec3),
}

/// Server -> client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    // ─── Connection ───
    /// First frame on every connection: the id the transport assigned.
    Welcome { id: ConnId },

    // ─── World ───
    /// Fraction of the day elapsed, in `[0, 1)`.
    TimeUpdate(f64),

    // ─── Players ───
    /// Everyone already in the world, sent to a player right after it is named.
    CurrentPlayers(BTreeMap<ConnId, PlayerRecord>),
    PlayerJoined(PlayerRecord),
    PlayerMoved(PlayerMoved),
    PlayerLeft(ConnId),
}

/// Position delta for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub id: ConnId,
    #[serde(flatten)]
    pub position: Vec3,
}

/// Serializes a message into a text frame.
pub fn encode<M: Serialize>(msg: &M) -> anyhow::Result<String> {
    serde_json::to_string(msg).context("serialize msg")
}

/// Parses a text frame.
pub fn decode<M: DeserializeOwned>(text: &str) -> anyhow::Result<M> {
    serde_json::from_str(text).context("deserialize msg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use serde_json::{json, Value};

    fn wire(msg: &ServerMsg) -> Value {
        serde_json::from_str(&encode(msg).unwrap()).unwrap()
    }

    #[test]
    fn client_events_use_socket_names() {
        let m: ClientMsg = decode(r#"{"event":"setName","data":"Alice"}"#).unwrap();
        assert_eq!(m, ClientMsg::SetName("Alice".into()));

        let m: ClientMsg = decode(r#"{"event":"move","data":{"x":1,"y":0.5,"z":2}}"#).unwrap();
        assert_eq!(m, ClientMsg::Move(Vec3::new(1.0, 0.5, 2.0)));
    }

    #[test]
    fn server_event_shapes() {
        assert_eq!(
            wire(&ServerMsg::TimeUpdate(0.25)),
            json!({"event": "timeUpdate", "data": 0.25})
        );
        assert_eq!(
            wire(&ServerMsg::PlayerLeft(ConnId::from("b"))),
            json!({"event": "playerLeft", "data": "b"})
        );
        assert_eq!(
            wire(&ServerMsg::PlayerMoved(PlayerMoved {
                id: ConnId::from("b"),
                position: Vec3::new(1.0, 0.5, 2.0),
            })),
            json!({"event": "playerMoved", "data": {"id": "b", "x": 1.0, "y": 0.5, "z": 2.0}})
        );
        assert_eq!(
            wire(&ServerMsg::Welcome { id: ConnId::from("a") }),
            json!({"event": "welcome", "data": {"id": "a"}})
        );
    }

    #[test]
    fn current_players_is_keyed_by_id() {
        let rec = PlayerRecord::spawn(ConnId::from("a"), "Alice", Color::new(0.0, 0.0, 1.0));
        let msg = ServerMsg::CurrentPlayers(BTreeMap::from([(rec.id.clone(), rec.clone())]));
        let v = wire(&msg);
        assert_eq!(v["event"], "currentPlayers");
        assert_eq!(v["data"]["a"]["name"], "Alice");
        assert_eq!(v["data"]["a"]["y"], 0.5);

        let back: ServerMsg = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(back, msg);

        assert_eq!(
            wire(&ServerMsg::CurrentPlayers(BTreeMap::new())),
            json!({"event": "currentPlayers", "data": {}})
        );
    }

    #[test]
    fn malformed_frames_are_errors() {
        for bad in [
            "",
            "not json",
            r#"{"event":"fly","data":1}"#,
            r#"{"event":"move","data":{"x":"one","y":0,"z":0}}"#,
            r#"{"event":"move","data":{"x":1}}"#,
            r#"{"event":"setName","data":42}"#,
        ] {
            assert!(decode::<ClientMsg>(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn conn_ids_are_unique() {
        let a = ConnId::new_unique();
        let b = ConnId::new_unique();
        assert_ne!(a, b);
    }
}

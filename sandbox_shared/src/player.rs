//! Player records as replicated to clients.

use serde::{Deserialize, Serialize};

use crate::{color::Color, math::Vec3, net::ConnId};

/// Where a freshly named player appears: on the ground plane, half a cube up.
pub const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 0.5, 0.0);

/// One named player.
///
/// Serializes as `{id, name, x, y, z, color: {r, g, b}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: ConnId,
    pub name: String,
    #[serde(flatten)]
    pub position: Vec3,
    pub color: Color,
}

impl PlayerRecord {
    /// Creates a record at the spawn position.
    pub fn spawn(id: ConnId, name: impl Into<String>, color: Color) -> Self {
        Self {
            id,
            name: name.into(),
            position: SPAWN_POSITION,
            color,
        }
    }
}

//! Input handling.
//!
//! Turns held movement keys into a new local position each frame. The local
//! player is authoritative for its own position; the server relays it as-is.

use serde::{Deserialize, Serialize};

use sandbox_shared::{math::Vec3, player::SPAWN_POSITION};

/// Units moved per frame while a key is held.
pub const MOVE_SPEED: f64 = 0.1;

/// Movement keys held during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    /// +z
    pub forward: bool,
    /// -z
    pub back: bool,
    /// -x
    pub left: bool,
    /// +x
    pub right: bool,
}

impl Keys {
    /// Parses a WASD string such as `"wd"`.
    pub fn from_wasd(s: &str) -> Self {
        let mut keys = Keys::default();
        for c in s.chars() {
            match c.to_ascii_lowercase() {
                'w' => keys.forward = true,
                's' => keys.back = true,
                'a' => keys.left = true,
                'd' => keys.right = true,
                _ => {}
            }
        }
        keys
    }

    fn delta(self, speed: f64) -> Vec3 {
        let mut d = Vec3::ZERO;
        if self.forward {
            d.z += speed;
        }
        if self.back {
            d.z -= speed;
        }
        if self.left {
            d.x -= speed;
        }
        if self.right {
            d.x += speed;
        }
        d
    }
}

/// Local player movement.
#[derive(Debug, Clone)]
pub struct Movement {
    pub position: Vec3,
    pub speed: f64,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            position: SPAWN_POSITION,
            speed: MOVE_SPEED,
        }
    }
}

impl Movement {
    /// Applies one frame of input. Returns the new position if any key moved it.
    pub fn step(&mut self, keys: Keys) -> Option<Vec3> {
        if keys == Keys::default() {
            return None;
        }
        self.position = self.position + keys.delta(self.speed);
        Some(self.position)
    }
}

//! Configuration system.
//!
//! Loads sandbox configuration from JSON strings/files. Every field has a
//! default, so a config file only needs the values it changes.

use std::{net::SocketAddr, path::Path, time::Duration};

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Root configuration shared by client/server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Server listen address, e.g. `127.0.0.1:3000`.
    pub server_addr: String,
    /// Directory the browser client is served from.
    pub static_dir: String,
    /// World clock tick interval in milliseconds.
    pub tick_ms: u64,
    /// Seconds for the world clock to go once round a full day.
    pub cycle_secs: u64,
    /// Frames buffered per connection before new ones are dropped.
    pub outbox_capacity: usize,
    /// Inbound events buffered for the hub.
    pub event_capacity: usize,
    /// Player name (client only). Empty picks a random one.
    pub player_name: String,
    /// WebSocket endpoint (client only).
    pub server_url: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3000".to_string(),
            static_dir: "client".to_string(),
            tick_ms: 1000,
            cycle_secs: 600,
            outbox_capacity: 256,
            event_capacity: 1024,
            player_name: String::new(),
            server_url: "ws://127.0.0.1:3000/ws".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.tick_ms > 0, "tick_ms must be positive");
        ensure!(self.cycle_secs > 0, "cycle_secs must be positive");
        ensure!(self.outbox_capacity > 0, "outbox_capacity must be positive");
        ensure!(self.event_capacity > 0, "event_capacity must be positive");
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server_addr.parse().context("parse server_addr")
    }

    /// Replaces the port of `server_addr`, keeping its host.
    pub fn set_port(&mut self, port: &str) -> anyhow::Result<()> {
        let port: u16 = port.trim().parse().context("parse port")?;
        let mut addr = self.listen_addr()?;
        addr.set_port(port);
        self.server_addr = addr.to_string();
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn cycle_duration(&self) -> Duration {
        Duration::from_secs(self.cycle_secs)
    }
}

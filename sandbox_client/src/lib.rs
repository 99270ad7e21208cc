//! `sandbox_client`
//!
//! Client-side systems, without rendering:
//! - WebSocket session (welcome, naming, moves)
//! - Remote player table kept the way the browser client keeps it
//! - Keyboard-style movement input

pub mod client;
pub mod input;

pub use client::SandboxClient;

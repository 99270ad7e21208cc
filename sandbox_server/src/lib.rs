//! `sandbox_server`
//!
//! Server-side systems:
//! - Player registry (owned records, snapshot on demand)
//! - Session protocol handler (lifecycle events -> targeted/broadcast messages)
//! - Hub task: single owner of all state, ticks the world clock
//! - axum web layer: `/ws`, `/api/health`, static client files
//!
//! Networking model:
//! - One WebSocket per client carrying JSON text frames.
//! - Fan-out is fire-and-forget through per-connection outboxes.

pub mod hub;
pub mod registry;
pub mod server;
pub mod session;
pub mod web;

pub use server::SandboxServer;

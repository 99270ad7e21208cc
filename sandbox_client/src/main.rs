//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p sandbox_client -- [--url ws://127.0.0.1:3000/ws] [--name Alice]
//!       [--config sandbox.json] [--frames 0]
//!
//! The client connects, names itself, walks a scripted square with WASD-style
//! input, and logs the players and world time it hears about. `--frames 0`
//! (the default) runs until the server goes away.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use sandbox_client::client::{ClientState, SandboxClient};
use sandbox_client::input::{Keys, Movement};
use sandbox_shared::clock::{clock_string, is_daytime};
use sandbox_shared::config::SandboxConfig;
use sandbox_shared::net::ServerMsg;
use tracing::{info, warn};

const FRAME: Duration = Duration::from_millis(50);
/// Frames spent walking each side of the square.
const LEG_FRAMES: u64 = 40;

fn parse_args() -> anyhow::Result<(SandboxConfig, u64)> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => SandboxConfig::from_file(&PathBuf::from(&args[i + 1]))?,
        _ => SandboxConfig::default(),
    };
    let mut frames = 0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--url" if i + 1 < args.len() => {
                cfg.server_url = args[i + 1].clone();
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                cfg.player_name = args[i + 1].clone();
                i += 2;
            }
            "--frames" if i + 1 < args.len() => {
                frames = args[i + 1].parse().context("parse --frames")?;
                i += 2;
            }
            _ => i += 1,
        }
    }

    if cfg.player_name.is_empty() {
        cfg.player_name = format!("Player{}", rand::thread_rng().gen_range(0..1000));
    }
    Ok((cfg, frames))
}

fn scripted_keys(frame: u64) -> Keys {
    match (frame / LEG_FRAMES) % 4 {
        0 => Keys::from_wasd("w"),
        1 => Keys::from_wasd("d"),
        2 => Keys::from_wasd("s"),
        _ => Keys::from_wasd("a"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (cfg, frames) = parse_args()?;
    info!(server = %cfg.server_url, name = %cfg.player_name, "Starting client");

    let mut client = SandboxClient::connect(&cfg.server_url)
        .await
        .context("connect")?;
    client.set_name(&cfg.player_name).await?;

    let mut movement = Movement::default();
    let mut daytime = None;
    let mut frame = 0u64;

    while frames == 0 || frame < frames {
        if let Some(pos) = movement.step(scripted_keys(frame)) {
            client.send_move(pos).await?;
        }

        while let Some(msg) = client.recv_timeout(Duration::ZERO).await? {
            match msg {
                ServerMsg::CurrentPlayers(players) => {
                    info!(count = players.len(), "Players already here");
                }
                ServerMsg::PlayerJoined(rec) => info!(id = %rec.id, name = %rec.name, "Player joined"),
                ServerMsg::PlayerLeft(id) => info!(%id, "Player left"),
                ServerMsg::TimeUpdate(t) => {
                    let now = is_daytime(t);
                    if daytime != Some(now) {
                        info!(time = %clock_string(t), "{}", if now { "Day" } else { "Night" });
                        daytime = Some(now);
                    }
                }
                ServerMsg::PlayerMoved(_) | ServerMsg::Welcome { .. } => {}
            }
        }

        if client.state == ClientState::Disconnected {
            warn!("Disconnected from server");
            return Ok(());
        }

        frame += 1;
        tokio::time::sleep(FRAME).await;
    }

    info!(players = client.world.players.len(), "Done, closing");
    client.close().await
}

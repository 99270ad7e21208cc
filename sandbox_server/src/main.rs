//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p sandbox_server -- [--config sandbox.json] [--addr 127.0.0.1:3000]
//!       [--static-dir client] [--tick-ms 1000] [--cycle-secs 600]
//!
//! `PORT` in the environment overrides the port of the listen address.
//!
//! Console commands:
//!   status   - Connection/player counts and clock
//!   players  - List named players
//!   time     - Current world time
//!   quit     - Shutdown server

use std::env;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use sandbox_server::SandboxServer;
use sandbox_shared::config::SandboxConfig;
use tokio::sync::mpsc;
use tracing::info;

fn parse_args() -> anyhow::Result<SandboxConfig> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => SandboxConfig::from_file(&PathBuf::from(&args[i + 1]))?,
        _ => SandboxConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--static-dir" if i + 1 < args.len() => {
                cfg.static_dir = args[i + 1].clone();
                i += 2;
            }
            "--tick-ms" if i + 1 < args.len() => {
                cfg.tick_ms = args[i + 1].parse().context("parse --tick-ms")?;
                i += 2;
            }
            "--cycle-secs" if i + 1 < args.len() => {
                cfg.cycle_secs = args[i + 1].parse().context("parse --cycle-secs")?;
                i += 2;
            }
            _ => i += 1,
        }
    }

    if let Ok(port) = env::var("PORT") {
        cfg.set_port(&port).context("apply PORT")?;
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        addr = %cfg.server_addr,
        tick_ms = cfg.tick_ms,
        cycle_secs = cfg.cycle_secs,
        static_dir = %cfg.static_dir,
        "Starting server"
    );

    let mut server = SandboxServer::bind(cfg).await.context("create server")?;
    let local = server.local_addr()?;
    info!("Server listening on http://{local}");

    // Set up console input channel.
    let (console_tx, console_rx) = mpsc::channel::<String>(32);
    server.set_console_input(console_rx);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            handle.shutdown();
        }
    });

    println!("Server ready. Type 'status' for info, 'players' to list players, 'quit' to exit.");
    println!();

    server.run().await
}

//! Server bootstrap.
//!
//! Binds the listener, builds the hub, and serves the router until a shutdown
//! is requested from the console, Ctrl-C, or a `HubHandle`.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use anyhow::Context;
use sandbox_shared::config::SandboxConfig;
use tokio::{net::TcpListener, sync::mpsc};
use tracing::{info, warn};

use crate::{
    hub::{Hub, HubHandle},
    web,
};

pub struct SandboxServer {
    pub cfg: SandboxConfig,
    listener: TcpListener,
    hub: Hub,
    handle: HubHandle,
}

impl SandboxServer {
    /// Validates the config and binds the listen address.
    pub async fn bind(cfg: SandboxConfig) -> anyhow::Result<Self> {
        cfg.validate().context("invalid config")?;
        let addr = cfg.listen_addr()?;
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        let (hub, handle) = Hub::new(&cfg);
        Ok(Self {
            cfg,
            listener,
            hub,
            handle,
        })
    }

    /// Returns the local address (after binding).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.hub.set_console_input(rx);
    }

    fn static_dir(&self) -> Option<PathBuf> {
        if self.cfg.static_dir.is_empty() {
            return None;
        }
        let dir = PathBuf::from(&self.cfg.static_dir);
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Static directory not found");
        }
        Some(dir)
    }

    /// Serves until shutdown, then waits for the hub to stop.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = web::router(
            self.handle.events.clone(),
            self.cfg.outbox_capacity,
            self.static_dir(),
        );
        let mut shutdown_rx = self.handle.shutdown_signal();
        let hub = tokio::spawn(self.hub.run());

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        return;
                    }
                }
                info!("Web server shutting down gracefully");
            })
            .await
            .context("serve")?;

        // Open sockets keep event senders alive, so stop the hub explicitly.
        self.handle.shutdown();
        hub.await.context("join hub")?;
        Ok(())
    }
}

/// Helper for tests: bind to an ephemeral localhost port.
pub async fn bind_ephemeral(cfg: SandboxConfig) -> anyhow::Result<(SandboxServer, SandboxConfig)> {
    let mut cfg = SandboxConfig {
        server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).to_string(),
        static_dir: String::new(),
        ..cfg
    };
    let server = SandboxServer::bind(cfg.clone()).await?;
    let addr = server.local_addr()?;
    cfg.server_addr = addr.to_string();
    cfg.server_url = format!("ws://{addr}/ws");
    Ok((server, cfg))
}

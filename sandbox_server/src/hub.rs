//! Hub task.
//!
//! The single owner of the session handler (and through it the registry and
//! clock). Connection tasks talk to it over one event channel; it ticks the
//! clock on a fixed interval and writes encoded frames into per-connection
//! outboxes. Events are processed one at a time, to completion.
//!
//! Fan-out is fire-and-forget: a full or closed outbox loses the frame and
//! never stalls delivery to other connections.

use std::{collections::HashMap, sync::Arc};

use sandbox_shared::{
    clock::{clock_string, WorldClock},
    config::SandboxConfig,
    net::{encode, ClientMsg, ConnId},
};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    time::{self, Instant},
};
use tracing::{debug, info, warn};

use crate::session::{Delivery, SessionHandler};

/// Encoded frames waiting to be written to one connection.
pub type Outbox = mpsc::Sender<String>;
pub type OutboxRx = mpsc::Receiver<String>;

/// Messages from connection tasks to the hub.
#[derive(Debug)]
pub enum HubEvent {
    Connected { id: ConnId, outbox: Outbox },
    Message { id: ConnId, msg: ClientMsg },
    Disconnected { id: ConnId },
}

pub type EventTx = mpsc::Sender<HubEvent>;
pub type EventRx = mpsc::Receiver<HubEvent>;

/// Cloneable access to a running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    pub events: EventTx,
    shutdown: Arc<watch::Sender<bool>>,
}

impl HubHandle {
    /// Asks the hub and the web server to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

pub struct Hub {
    handler: SessionHandler,
    outboxes: HashMap<ConnId, Outbox>,
    events: EventRx,
    console_rx: Option<mpsc::Receiver<String>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Hub {
    pub fn new(cfg: &SandboxConfig) -> (Self, HubHandle) {
        let clock = WorldClock::new(cfg.tick_interval(), cfg.cycle_duration());
        Self::with_handler(SessionHandler::new(clock), cfg.event_capacity)
    }

    pub fn with_handler(handler: SessionHandler, event_capacity: usize) -> (Self, HubHandle) {
        let (events_tx, events) = mpsc::channel(event_capacity);
        let (shutdown, _) = watch::channel(false);
        let shutdown = Arc::new(shutdown);
        let hub = Self {
            handler,
            outboxes: HashMap::new(),
            events,
            console_rx: None,
            shutdown: shutdown.clone(),
        };
        let handle = HubHandle {
            events: events_tx,
            shutdown,
        };
        (hub, handle)
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.console_rx = Some(rx);
    }

    /// Runs until shutdown is requested or every event sender is gone.
    pub async fn run(mut self) {
        let period = self.handler.clock().tick_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        let mut shutdown_rx = self.shutdown.subscribe();

        info!(tick_ms = period.as_millis() as u64, "Hub running");

        loop {
            tokio::select! {
                ev = self.events.recv() => match ev {
                    Some(ev) => self.on_event(ev),
                    None => break,
                },
                _ = ticker.tick() => {
                    let out = self.handler.tick();
                    self.dispatch(out);
                }
                line = next_console_line(&mut self.console_rx) => match line {
                    Some(line) => {
                        for out in self.exec_console(&line) {
                            println!("{out}");
                        }
                    }
                    None => self.console_rx = None,
                },
                _ = wait_for_shutdown(&mut shutdown_rx) => break,
            }
        }

        info!("Hub stopped");
    }

    fn on_event(&mut self, ev: HubEvent) {
        match ev {
            HubEvent::Connected { id, outbox } => {
                self.outboxes.insert(id.clone(), outbox);
                let out = self.handler.connect(&id);
                self.dispatch(out);
            }
            HubEvent::Message { id, msg } => {
                let out = self.handler.handle(&id, msg);
                self.dispatch(out);
            }
            HubEvent::Disconnected { id } => {
                // Drop the outbox first so the leave notice only reaches those remaining.
                self.outboxes.remove(&id);
                let out = self.handler.disconnect(&id);
                self.dispatch(out);
            }
        }
    }

    fn dispatch(&mut self, deliveries: Vec<Delivery>) {
        let mut closed = Vec::new();
        for delivery in deliveries {
            let frame = match encode(&delivery.msg) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "Failed to encode outbound message");
                    continue;
                }
            };
            for (id, outbox) in &self.outboxes {
                if !delivery.to.includes(id) {
                    continue;
                }
                match outbox.try_send(frame.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!(conn = %id, "Outbox full, frame dropped");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(id.clone()),
                }
            }
        }
        for id in closed {
            debug!(conn = %id, "Outbox closed");
            self.outboxes.remove(&id);
        }
    }

    /// Executes an operator console command.
    pub fn exec_console(&mut self, line: &str) -> Vec<String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(cmd) = tokens.first() else {
            return Vec::new();
        };

        match *cmd {
            "status" => {
                let status = self.handler.status();
                vec![
                    format!("Connections: {}", status.connections),
                    format!("Players: {}", status.players),
                    format!("Clock: {:.4} ({})", status.clock, clock_string(status.clock)),
                ]
            }
            "players" => {
                let registry = self.handler.registry();
                if registry.is_empty() {
                    return vec!["No players".to_string()];
                }
                registry
                    .iter()
                    .map(|p| {
                        format!(
                            "  {}: {} at ({:.2}, {:.2}, {:.2})",
                            p.id, p.name, p.position.x, p.position.y, p.position.z
                        )
                    })
                    .collect()
            }
            "time" => {
                let t = self.handler.clock().value();
                vec![format!("{t:.4} {}", clock_string(t))]
            }
            "quit" | "exit" => {
                info!("Shutdown requested from console");
                self.shutdown.send_replace(true);
                vec!["Shutting down".to_string()]
            }
            other => vec![format!("Unknown command: {other}")],
        }
    }
}

async fn next_console_line(rx: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            // Sender lives as long as the hub; nothing left to wait for.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_shared::{
        math::Vec3,
        net::{decode, ServerMsg},
    };
    use std::time::Duration;

    const SLOW: Duration = Duration::from_secs(3600);
    const QUIET: Duration = Duration::from_millis(200);

    fn spawn_for_tests(tick: Duration) -> HubHandle {
        let cfg = SandboxConfig {
            tick_ms: tick.as_millis() as u64,
            ..Default::default()
        };
        let (hub, handle) = Hub::new(&cfg);
        tokio::spawn(hub.run());
        handle
    }

    async fn connect(handle: &HubHandle, name: &str, capacity: usize) -> (ConnId, OutboxRx) {
        let id = ConnId::from(name);
        let (tx, rx) = mpsc::channel(capacity);
        handle
            .events
            .send(HubEvent::Connected {
                id: id.clone(),
                outbox: tx,
            })
            .await
            .unwrap();
        (id, rx)
    }

    async fn recv(rx: &mut OutboxRx) -> ServerMsg {
        let frame = time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out")
            .expect("outbox closed");
        decode(&frame).unwrap()
    }

    async fn send(handle: &HubHandle, id: &ConnId, msg: ClientMsg) {
        handle
            .events
            .send(HubEvent::Message { id: id.clone(), msg })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn newcomer_gets_welcome_then_time() {
        let handle = spawn_for_tests(SLOW);
        let (id, mut rx) = connect(&handle, "a", 8).await;
        assert_eq!(recv(&mut rx).await, ServerMsg::Welcome { id });
        assert_eq!(recv(&mut rx).await, ServerMsg::TimeUpdate(0.0));
        handle.shutdown();
    }

    #[tokio::test]
    async fn moves_reach_others_but_not_sender() {
        let handle = spawn_for_tests(SLOW);
        let (a, mut a_rx) = connect(&handle, "a", 8).await;
        let (_b, mut b_rx) = connect(&handle, "b", 8).await;
        for rx in [&mut a_rx, &mut b_rx] {
            recv(rx).await;
            recv(rx).await;
        }

        send(&handle, &a, ClientMsg::SetName("Alice".into())).await;
        assert!(matches!(recv(&mut a_rx).await, ServerMsg::CurrentPlayers(p) if p.is_empty()));
        assert!(matches!(recv(&mut b_rx).await, ServerMsg::PlayerJoined(r) if r.name == "Alice"));

        send(&handle, &a, ClientMsg::Move(Vec3::new(3.0, 0.5, 1.0))).await;
        match recv(&mut b_rx).await {
            ServerMsg::PlayerMoved(m) => {
                assert_eq!(m.id, a);
                assert_eq!(m.position, Vec3::new(3.0, 0.5, 1.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(time::timeout(QUIET, a_rx.recv()).await.is_err());

        handle
            .events
            .send(HubEvent::Disconnected { id: a.clone() })
            .await
            .unwrap();
        assert_eq!(recv(&mut b_rx).await, ServerMsg::PlayerLeft(a));
        handle.shutdown();
    }

    #[tokio::test]
    async fn clock_ticks_reach_everyone() {
        let handle = spawn_for_tests(Duration::from_millis(20));
        let (_a, mut a_rx) = connect(&handle, "a", 8).await;
        recv(&mut a_rx).await;
        recv(&mut a_rx).await;

        match recv(&mut a_rx).await {
            ServerMsg::TimeUpdate(t) => assert!(t > 0.0 && t < 1.0),
            other => panic!("unexpected {other:?}"),
        }
        handle.shutdown();
    }

    #[tokio::test]
    async fn stalled_outbox_does_not_block_others() {
        let handle = spawn_for_tests(SLOW);
        // Capacity 1: the welcome frame fills it and nothing is ever read.
        let (_stuck, _stuck_rx) = connect(&handle, "stuck", 1).await;
        let (a, mut a_rx) = connect(&handle, "a", 64).await;
        let (_b, mut b_rx) = connect(&handle, "b", 64).await;
        for rx in [&mut a_rx, &mut b_rx] {
            recv(rx).await;
            recv(rx).await;
        }

        send(&handle, &a, ClientMsg::SetName("Alice".into())).await;
        recv(&mut a_rx).await;
        recv(&mut b_rx).await;
        for i in 0..10 {
            send(&handle, &a, ClientMsg::Move(Vec3::new(i as f64, 0.5, 0.0))).await;
        }
        for i in 0..10 {
            match recv(&mut b_rx).await {
                ServerMsg::PlayerMoved(m) => assert_eq!(m.position.x, i as f64),
                other => panic!("unexpected {other:?}"),
            }
        }
        handle.shutdown();
    }

    #[tokio::test]
    async fn console_commands() {
        let cfg = SandboxConfig::default();
        let (mut hub, handle) = Hub::new(&cfg);
        let mut stop = handle.shutdown_signal();

        assert!(hub.exec_console("   ").is_empty());
        assert_eq!(hub.exec_console("players"), vec!["No players".to_string()]);
        assert_eq!(hub.exec_console("time"), vec!["0.0000 12:00 AM".to_string()]);
        let status = hub.exec_console("status");
        assert_eq!(status[0], "Connections: 0");
        assert_eq!(hub.exec_console("fly"), vec!["Unknown command: fly".to_string()]);

        assert!(!*stop.borrow_and_update());
        hub.exec_console("quit");
        assert!(*stop.borrow_and_update());
    }
}

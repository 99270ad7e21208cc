//! Client implementation.
//!
//! The client maintains:
//! - One WebSocket carrying JSON text frames
//! - A `WorldView`: every player it has been told about plus the last world
//!   time the server broadcast

use std::{collections::BTreeMap, time::Duration};

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use sandbox_shared::{
    math::Vec3,
    net::{decode, encode, ClientMsg, ConnId, ServerMsg},
    player::PlayerRecord,
};
use tokio::{net::TcpStream, time::Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// Connected, no name sent yet.
    Connected,
    /// Name sent; the server knows this player.
    Named,
    /// Socket closed.
    Disconnected,
}

/// What this client knows about the shared world.
#[derive(Debug, Clone, Default)]
pub struct WorldView {
    /// Players known to this client, keyed by id.
    pub players: BTreeMap<ConnId, PlayerRecord>,
    /// Last `timeUpdate` value.
    pub time: Option<f64>,
}

impl WorldView {
    /// Folds a server message into the view.
    ///
    /// Joins never replace a known player, moves for unknown ids are ignored.
    pub fn apply(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::Welcome { id } => {
                debug!(conn = %id, "Repeated welcome ignored");
            }
            ServerMsg::TimeUpdate(t) => self.time = Some(*t),
            ServerMsg::CurrentPlayers(players) => {
                for rec in players.values() {
                    self.add_player(rec);
                }
            }
            ServerMsg::PlayerJoined(rec) => self.add_player(rec),
            ServerMsg::PlayerMoved(moved) => {
                if let Some(rec) = self.players.get_mut(&moved.id) {
                    rec.position = moved.position;
                }
            }
            ServerMsg::PlayerLeft(id) => {
                self.players.remove(id);
            }
        }
    }

    fn add_player(&mut self, rec: &PlayerRecord) {
        self.players
            .entry(rec.id.clone())
            .or_insert_with(|| rec.clone());
    }
}

/// High-level sandbox client.
pub struct SandboxClient {
    pub conn_id: ConnId,
    pub state: ClientState,
    pub world: WorldView,

    ws: WsStream,
}

impl SandboxClient {
    /// Opens the socket and waits for the server's welcome.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        info!(%url, "Connecting to server");
        let (mut ws, _) = connect_async(url).await.context("ws connect")?;

        let conn_id = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => match decode::<ServerMsg>(&text)? {
                    ServerMsg::Welcome { id } => break id,
                    other => anyhow::bail!("expected welcome, got {other:?}"),
                },
                Some(Ok(Message::Close(_))) | None => anyhow::bail!("closed before welcome"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e).context("ws read"),
            }
        };

        info!(conn = %conn_id, "Connected to server");
        Ok(Self {
            conn_id,
            state: ClientState::Connected,
            world: WorldView::default(),
            ws,
        })
    }

    async fn send(&mut self, msg: &ClientMsg) -> anyhow::Result<()> {
        let text = encode(msg)?;
        self.ws.send(Message::Text(text)).await.context("ws send")
    }

    pub async fn set_name(&mut self, name: &str) -> anyhow::Result<()> {
        self.send(&ClientMsg::SetName(name.to_string())).await?;
        self.state = ClientState::Named;
        Ok(())
    }

    pub async fn send_move(&mut self, position: Vec3) -> anyhow::Result<()> {
        self.send(&ClientMsg::Move(position)).await
    }

    /// Sends an arbitrary text frame. Used to exercise the server's parser.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .context("ws send")
    }

    /// Waits up to `timeout` for the next server message and applies it.
    ///
    /// Returns `None` on timeout or once the socket has closed.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> anyhow::Result<Option<ServerMsg>> {
        let deadline = Instant::now() + timeout;
        loop {
            let frame = match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Ok(frame) => frame,
                Err(_) => return Ok(None),
            };
            match frame {
                Some(Ok(Message::Text(text))) => match decode::<ServerMsg>(&text) {
                    Ok(msg) => {
                        self.world.apply(&msg);
                        return Ok(Some(msg));
                    }
                    Err(e) => warn!(error = %e, "Dropping malformed server frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    self.state = ClientState::Disconnected;
                    return Ok(None);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.state = ClientState::Disconnected;
                    return Err(e).context("ws read");
                }
            }
        }
    }

    /// Sends a close frame and waits for the server to acknowledge it.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await.context("ws close")?;
        while let Some(Ok(_)) = self.ws.next().await {}
        self.state = ClientState::Disconnected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_shared::{color::PALETTE, net::PlayerMoved};

    fn rec(id: &str, name: &str) -> PlayerRecord {
        PlayerRecord::spawn(ConnId::from(id), name, PALETTE[3])
    }

    #[test]
    fn joins_do_not_replace_known_players() {
        let mut view = WorldView::default();
        view.apply(&ServerMsg::PlayerJoined(rec("a", "Alice")));
        view.apply(&ServerMsg::CurrentPlayers(BTreeMap::from([(
            ConnId::from("a"),
            rec("a", "Impostor"),
        )])));
        assert_eq!(view.players.len(), 1);
        assert_eq!(view.players[&ConnId::from("a")].name, "Alice");
    }

    #[test]
    fn moves_update_known_players_only() {
        let mut view = WorldView::default();
        view.apply(&ServerMsg::PlayerJoined(rec("a", "Alice")));
        view.apply(&ServerMsg::PlayerMoved(PlayerMoved {
            id: ConnId::from("a"),
            position: Vec3::new(1.0, 0.5, 2.0),
        }));
        view.apply(&ServerMsg::PlayerMoved(PlayerMoved {
            id: ConnId::from("ghost"),
            position: Vec3::ZERO,
        }));
        assert_eq!(view.players.len(), 1);
        assert_eq!(
            view.players[&ConnId::from("a")].position,
            Vec3::new(1.0, 0.5, 2.0)
        );
    }

    #[test]
    fn time_and_leave() {
        let mut view = WorldView::default();
        view.apply(&ServerMsg::TimeUpdate(0.5));
        assert_eq!(view.time, Some(0.5));

        view.apply(&ServerMsg::PlayerJoined(rec("b", "Bob")));
        view.apply(&ServerMsg::PlayerLeft(ConnId::from("b")));
        view.apply(&ServerMsg::PlayerLeft(ConnId::from("b")));
        assert!(view.players.is_empty());
    }
}

//! Helpers shared by the integration tests.

use std::time::Duration;

use sandbox_client::SandboxClient;
use sandbox_server::{hub::HubHandle, server::bind_ephemeral};
use sandbox_shared::{config::SandboxConfig, net::ServerMsg};

/// How long a test waits for a message it expects.
pub const EXPECT: Duration = Duration::from_secs(2);
/// How long a test listens to be sure a message does not arrive.
pub const QUIET: Duration = Duration::from_millis(300);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Starts a server on an ephemeral port. Returns its config (with the bound
/// address filled in) and a handle to stop it.
pub async fn start_server(tick_ms: u64) -> anyhow::Result<(SandboxConfig, HubHandle)> {
    init_tracing();
    let (server, cfg) = bind_ephemeral(SandboxConfig {
        tick_ms,
        ..Default::default()
    })
    .await?;
    let handle = server.handle();
    tokio::spawn(server.run());
    Ok((cfg, handle))
}

/// Next message that is not a clock broadcast.
pub async fn next_event(
    client: &mut SandboxClient,
    wait: Duration,
) -> anyhow::Result<Option<ServerMsg>> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let left = deadline.saturating_duration_since(tokio::time::Instant::now());
        match client.recv_timeout(left).await? {
            Some(ServerMsg::TimeUpdate(_)) => continue,
            other => return Ok(other),
        }
    }
}

/// Next non-clock message, failing the test if none arrives.
pub async fn expect_event(client: &mut SandboxClient) -> anyhow::Result<ServerMsg> {
    next_event(client, EXPECT)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no message within {EXPECT:?}"))
}

/// Connects and consumes the initial clock value.
pub async fn connect(cfg: &SandboxConfig) -> anyhow::Result<SandboxClient> {
    let mut client = SandboxClient::connect(&cfg.server_url).await?;
    match client.recv_timeout(EXPECT).await? {
        Some(ServerMsg::TimeUpdate(_)) => Ok(client),
        other => anyhow::bail!("expected timeUpdate after welcome, got {other:?}"),
    }
}

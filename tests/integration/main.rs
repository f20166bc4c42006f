//! Tandem integration test harness.
//!
//! Every test spawns its own in-process server on 127.0.0.1:0 and talks to
//! it over real WebSocket and HTTP connections:
//!
//!   cargo test --test integration
//!
//! Forwarded-for headers are trusted, so each client can claim its own
//! address and the same-address rule stays out of the way unless a test
//! wants it. Time is a manual clock the test advances explicitly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tandem_api::ApiState;
use tandem_core::config::TandemConfig;
use tandem_core::Location;
use tandem_services::{ManualClock, StaticResolver};

mod http;
mod matching;
mod signaling;

// ── Harness ───────────────────────────────────────────────────────────────────

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: ApiState,
    pub clock: Arc<ManualClock>,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://{}/api{}", self.addr, path)
    }
}

/// Every resolved peer lands here.
pub fn berlin() -> Location {
    Location::new("Germany", "DE", Some("Berlin".into()), Some("Berlin".into()))
}

pub async fn spawn_server() -> Result<TestServer> {
    spawn_server_with(|_| {}).await
}

pub async fn spawn_server_with(configure: impl FnOnce(&mut TandemConfig)) -> Result<TestServer> {
    let mut config = TandemConfig::default();
    config.server.trust_forwarded_for = true;
    config.server.environment = "test".into();
    configure(&mut config);

    let clock = Arc::new(ManualClock::new());
    let state = ApiState::new(config, Arc::new(StaticResolver::new(berlin())), clock.clone());
    let app = tandem_api::router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });

    Ok(TestServer { addr, state, clock, handle })
}

/// One WebSocket peer.
pub struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    /// Connect claiming `ip` as the client address.
    pub async fn connect(server: &TestServer, ip: &str) -> Result<Self> {
        let mut request = server.ws_url().into_client_request()?;
        request.headers_mut().insert("x-forwarded-for", ip.parse()?);
        let (ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .with_context(|| format!("websocket connect as {ip}"))?;
        Ok(Self { ws })
    }

    /// Connect and give the location lookup a moment to land.
    pub async fn connect_located(server: &TestServer, ip: &str) -> Result<Self> {
        let client = Self::connect(server, ip).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(client)
    }

    pub async fn send(&mut self, frame: Value) -> Result<()> {
        self.ws.send(Message::Text(frame.to_string().into())).await?;
        Ok(())
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.ws.send(Message::Text(text.to_string().into())).await?;
        Ok(())
    }

    pub async fn send_type(&mut self, kind: &str) -> Result<()> {
        self.send(json!({ "type": kind })).await
    }

    pub async fn recv(&mut self) -> Result<Value> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .context("timed out waiting for a frame")?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(text.as_str())?),
                Some(Ok(Message::Close(_))) | None => bail!("connection closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("websocket error: {e}"),
            }
        }
    }

    /// Receive the next frame and check its type.
    pub async fn expect(&mut self, kind: &str) -> Result<Value> {
        let frame = self.recv().await?;
        if frame["type"] != kind {
            bail!("expected {kind}, got {frame}");
        }
        Ok(frame)
    }

    /// Nothing arrives within `ms`.
    pub async fn expect_silence(&mut self, ms: u64) -> Result<()> {
        match tokio::time::timeout(Duration::from_millis(ms), self.ws.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => bail!("unexpected frame: {text}"),
            Ok(other) => bail!("unexpected socket event: {other:?}"),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

/// Two fresh peers matched with each other. Returns (first, second, sessionId).
pub async fn matched_pair(server: &TestServer) -> Result<(Client, Client, Value)> {
    let mut a = Client::connect(server, "198.51.100.1").await?;
    let mut b = Client::connect(server, "198.51.100.2").await?;
    a.send_type("find-match").await?;
    a.expect("waiting-for-match").await?;
    b.send_type("find-match").await?;
    let found_b = b.expect("match-found").await?;
    let found_a = a.expect("match-found").await?;
    let session = found_a["data"]["sessionId"].clone();
    if found_b["data"]["sessionId"] != session {
        bail!("session ids differ: {found_a} vs {found_b}");
    }
    Ok((a, b, session))
}

pub async fn get_json(server: &TestServer, path: &str) -> Result<Value> {
    let response = reqwest::get(server.api_url(path)).await?.error_for_status()?;
    Ok(response.json().await?)
}

/// POST a JSON body as `ip`. Returns the status code and raw body.
pub async fn post_json(server: &TestServer, path: &str, ip: &str, body: Value) -> Result<(u16, String)> {
    let response = reqwest::Client::new()
        .post(server.api_url(path))
        .header("x-forwarded-for", ip)
        .json(&body)
        .send()
        .await?;
    let status = response.status().as_u16();
    Ok((status, response.text().await?))
}

/// Poll the coordinator until `check` holds; the socket task unregisters
/// asynchronously after a close.
pub async fn eventually(server: &TestServer, check: impl Fn(&tandem_services::CoordinatorStats) -> bool) -> Result<()> {
    for _ in 0..50 {
        let stats = server.state.coordinator.lock().await.stats();
        if check(&stats) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("coordinator never reached the expected state")
}

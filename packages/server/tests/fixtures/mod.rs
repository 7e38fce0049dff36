//! Shared helpers for the integration tests.
//!
//! Each test gets its own in-process server on an ephemeral port, configured
//! with the widgets below.

#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use chatelly_server::Config;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    time::timeout,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// Widget of tenant `site-1`
pub const WIDGET_KEY: &str = "cw_0123456789abcdef_0123456789abcdef";
/// Widget of tenant `site-2`
pub const OTHER_WIDGET_KEY: &str = "cw_1111111111111111_2222222222222222";
/// Disabled widget of tenant `site-3`
pub const DISABLED_WIDGET_KEY: &str = "cw_fedcba9876543210_fedcba9876543210";

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(&[]).await
    }

    /// Start a server with extra command line arguments.
    pub async fn start_with(extra_args: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let mut args = vec![
            "chatelly-server".to_string(),
            "--widget".to_string(),
            format!("{WIDGET_KEY}=site-1"),
            "--widget".to_string(),
            format!("{OTHER_WIDGET_KEY}=site-2"),
            "--widget".to_string(),
            format!("{DISABLED_WIDGET_KEY}=site-3!"),
        ];
        args.extend(extra_args.iter().map(|arg| arg.to_string()));
        let config = Config::try_parse_from(args).expect("Invalid test configuration");

        let (shutdown, signal) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = chatelly_server::serve(listener, config, async {
                let _ = signal.await;
            })
            .await;
        });

        Self {
            addr,
            shutdown: Some(shutdown),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, widget_key: &str, session_id: &str) -> String {
        format!("ws://{}/ws/{}?session_id={}", self.addr, widget_key, session_id)
    }

    /// Connect and wait for `connection_established`.
    pub async fn connect(&self, widget_key: &str, session_id: &str) -> WsClient {
        let (mut ws, _) = connect_async(self.ws_url(widget_key, session_id))
            .await
            .expect("Failed to connect");
        let greeting = next_json(&mut ws).await;
        assert_eq!(greeting["type"], "connection_established");
        ws
    }

    /// Poll the stats endpoint until `total_connections` reaches `expected`.
    pub async fn wait_for_connections(&self, expected: u64) -> Value {
        let client = reqwest::Client::new();
        let mut last = Value::Null;
        for _ in 0..40 {
            last = client
                .get(format!("{}/api/hub/stats", self.base_url()))
                .send()
                .await
                .expect("Failed to send request")
                .json()
                .await
                .expect("Failed to parse JSON");
            if last["total_connections"] == expected {
                return last;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("expected {expected} connections, last stats: {last}");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Next text frame parsed as JSON. Control frames are skipped.
pub async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let message = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for a message")
            .expect("Connection closed")
            .expect("WebSocket error");
        match message {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("Server sent invalid JSON");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

pub async fn send_json(ws: &mut WsClient, value: Value) {
    send_text(ws, &value.to_string()).await;
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("Failed to send message");
}

/// Send a ping envelope and assert that the next message is its pong.
///
/// Messages from one connection are handled in order, so anything the server
/// sent this client before the pong would show up here first.
pub async fn assert_nothing_pending(ws: &mut WsClient) {
    send_json(ws, serde_json::json!({"type": "ping"})).await;
    let next = next_json(ws).await;
    assert_eq!(next["type"], "pong", "unexpected message: {next}");
}

/// Wait until the server closes the connection.
pub async fn expect_closed(ws: &mut WsClient) {
    loop {
        match timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for close")
        {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => continue,
        }
    }
}

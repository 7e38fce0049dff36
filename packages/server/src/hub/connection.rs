//! One visitor's WebSocket connection.
//!
//! A [`Connection`] owns the socket for its whole life and runs two pumps:
//!
//! - the read pump parses frames into envelopes, stamps them with this
//!   connection's identity and forwards them to the hub in read order;
//! - the write pump drains the bounded outbound buffer filled by the hub and
//!   sends periodic pings.
//!
//! Whichever pump stops first ends the connection. The hub only ever holds a
//! [`ConnectionHandle`] and the sending half of the outbound buffer.

use std::{
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use axum::extract::ws::{Message, Utf8Bytes};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    sync::mpsc,
    time::{Instant, interval_at, timeout, timeout_at},
};

use crate::{
    domain::{ChatId, ConnectionId, ConnectionIdFactory, SessionId, TenantKey, Timestamp},
    infrastructure::dto::websocket::InboundEnvelope,
};

use super::Hub;

/// Identity of a connection as known to the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub session_id: SessionId,
    pub tenant: TenantKey,
    /// Chat opened for this session at handshake time
    pub chat_id: ChatId,
}

impl ConnectionHandle {
    pub fn new(session_id: SessionId, tenant: TenantKey, chat_id: ChatId) -> Self {
        Self {
            id: ConnectionIdFactory::generate(),
            session_id,
            tenant,
            chat_id,
        }
    }
}

/// Timeouts and limits of a connection
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Capacity of the outbound buffer
    pub send_buffer_capacity: usize,
    /// Time allowed to write one frame to the peer
    pub write_wait: Duration,
    /// Time allowed to read the next pong from the peer
    pub pong_wait: Duration,
    /// Ping interval, must be shorter than `pong_wait`
    pub ping_period: Duration,
    /// Largest inbound frame accepted, in bytes
    pub max_message_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(60);
        Self {
            send_buffer_capacity: 256,
            write_wait: Duration::from_secs(10),
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            max_message_size: 512,
        }
    }
}

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl ConnectionState {
    fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Active) | (Connecting, Closed) | (Active, Closing) | (Closing, Closed)
        )
    }
}

/// Liveness timestamps shared by both pumps (Unix seconds, 0 = never)
#[derive(Debug, Default)]
pub struct Liveness {
    last_write: AtomicI64,
    last_pong: AtomicI64,
}

impl Liveness {
    fn record_write(&self) {
        self.last_write.store(Timestamp::now().value(), Ordering::Relaxed);
    }

    fn record_pong(&self) {
        self.last_pong.store(Timestamp::now().value(), Ordering::Relaxed);
    }

    /// Last successful write of an application message.
    pub fn last_write(&self) -> i64 {
        self.last_write.load(Ordering::Relaxed)
    }

    /// Last pong received from the peer.
    pub fn last_pong(&self) -> i64 {
        self.last_pong.load(Ordering::Relaxed)
    }
}

/// Why the read pump stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadExit {
    /// The peer sent a close frame
    PeerClosed,
    /// The stream ended without a close frame
    StreamEnded,
    /// No pong arrived within `pong_wait`
    DeadlineExceeded,
    MessageTooLarge(usize),
    Transport(String),
    /// The hub loop is gone
    HubClosed,
}

/// Why the write pump stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteExit {
    /// The hub closed the outbound buffer
    BufferClosed,
    Timeout,
    Transport(String),
}

/// A visitor connection accepted at handshake time
pub struct Connection {
    handle: ConnectionHandle,
    settings: ConnectionSettings,
    state: ConnectionState,
    liveness: Arc<Liveness>,
}

impl Connection {
    pub fn new(handle: ConnectionHandle, settings: ConnectionSettings) -> Self {
        Self {
            handle,
            settings,
            state: ConnectionState::Connecting,
            liveness: Arc::new(Liveness::default()),
        }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn liveness(&self) -> Arc<Liveness> {
        Arc::clone(&self.liveness)
    }

    fn transition(&mut self, next: ConnectionState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                session_id = %self.handle.session_id,
                from = ?self.state,
                to = ?next,
                "Unexpected connection state transition"
            );
        }
        tracing::debug!(session_id = %self.handle.session_id, from = ?self.state, to = ?next, "Connection state");
        self.state = next;
    }

    /// Register with the hub and pump frames until either side stops.
    ///
    /// Returns once both pumps have exited and the connection is unregistered.
    pub async fn run<W, R, E>(mut self, sink: W, stream: R, hub: Hub) -> ConnectionState
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: Display + Send,
        R: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: Display + Send,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(self.settings.send_buffer_capacity);

        if let Err(e) = hub.register(self.handle.clone(), outbound_tx).await {
            tracing::error!(session_id = %self.handle.session_id, error = %e, "Failed to register connection");
            self.transition(ConnectionState::Closed);
            return self.state;
        }
        self.transition(ConnectionState::Active);

        let mut write_task = tokio::spawn(write_pump(
            sink,
            outbound_rx,
            self.settings.clone(),
            self.liveness(),
        ));

        let mut write_finished = false;
        tokio::select! {
            exit = read_pump(stream, &hub, &self.handle, &self.settings, &self.liveness) => {
                tracing::debug!(session_id = %self.handle.session_id, reason = ?exit, "Read pump stopped");
            }
            exit = &mut write_task => {
                write_finished = true;
                tracing::debug!(session_id = %self.handle.session_id, reason = ?exit, "Write pump stopped");
            }
        }
        self.transition(ConnectionState::Closing);

        if let Err(e) = hub.unregister(self.handle.clone()).await {
            tracing::debug!(session_id = %self.handle.session_id, error = %e, "Unregister skipped");
        }

        // Unregistering closed the buffer, so the write pump flushes what is
        // left and sends a close frame.
        if !write_finished && timeout(self.settings.write_wait, &mut write_task).await.is_err() {
            write_task.abort();
        }

        tracing::info!(
            tenant = %self.handle.tenant,
            session_id = %self.handle.session_id,
            last_write = self.liveness.last_write(),
            last_pong = self.liveness.last_pong(),
            "Connection closed"
        );
        self.transition(ConnectionState::Closed);
        self.state
    }
}

/// Forward inbound frames to the hub until the peer goes away.
pub async fn read_pump<R, E>(
    mut stream: R,
    hub: &Hub,
    handle: &ConnectionHandle,
    settings: &ConnectionSettings,
    liveness: &Liveness,
) -> ReadExit
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + settings.pong_wait;

    loop {
        let message = match timeout_at(deadline, stream.next()).await {
            Err(_) => return ReadExit::DeadlineExceeded,
            Ok(None) => return ReadExit::StreamEnded,
            Ok(Some(Err(e))) => {
                tracing::warn!(session_id = %handle.session_id, error = %e, "WebSocket read error");
                return ReadExit::Transport(e.to_string());
            }
            Ok(Some(Ok(message))) => message,
        };

        let raw = match &message {
            Message::Text(text) => text.as_str().as_bytes(),
            Message::Binary(data) => data.as_ref(),
            Message::Pong(_) => {
                deadline = Instant::now() + settings.pong_wait;
                liveness.record_pong();
                continue;
            }
            // Pongs to client pings are queued by the WebSocket layer itself.
            Message::Ping(_) => continue,
            Message::Close(_) => {
                tracing::info!(session_id = %handle.session_id, "Client requested close");
                return ReadExit::PeerClosed;
            }
        };

        if raw.len() > settings.max_message_size {
            tracing::warn!(
                session_id = %handle.session_id,
                size = raw.len(),
                limit = settings.max_message_size,
                "Inbound message exceeds size limit"
            );
            return ReadExit::MessageTooLarge(raw.len());
        }

        let envelope = match InboundEnvelope::parse(raw) {
            Ok(inbound) => inbound.stamp(&handle.session_id, &handle.tenant, Timestamp::now()),
            Err(e) => {
                tracing::warn!(session_id = %handle.session_id, error = %e, "Dropping malformed envelope");
                continue;
            }
        };

        if hub.dispatch(handle.clone(), envelope).await.is_err() {
            return ReadExit::HubClosed;
        }
    }
}

/// Write queued messages and pings to the peer.
pub async fn write_pump<W>(
    mut sink: W,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
    settings: ConnectionSettings,
    liveness: Arc<Liveness>,
) -> WriteExit
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let mut ping_timer = interval_at(Instant::now() + settings.ping_period, settings.ping_period);

    loop {
        tokio::select! {
            item = outbound.recv() => {
                let Some(text) = item else {
                    // Best effort: the peer may already be gone.
                    let _ = timeout(settings.write_wait, sink.send(Message::Close(None))).await;
                    return WriteExit::BufferClosed;
                };
                if let Err(exit) = write_frame(&mut sink, Message::Text(text), settings.write_wait).await {
                    return exit;
                }
                liveness.record_write();
            }
            _ = ping_timer.tick() => {
                if let Err(exit) = write_frame(&mut sink, Message::Ping(Default::default()), settings.write_wait).await {
                    return exit;
                }
            }
        }
    }
}

async fn write_frame<W>(sink: &mut W, message: Message, write_wait: Duration) -> Result<(), WriteExit>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    match timeout(write_wait, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "WebSocket write error");
            Err(WriteExit::Transport(e.to_string()))
        }
        Err(_) => {
            tracing::warn!("WebSocket write timed out");
            Err(WriteExit::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{HubSettings, test_support};
    use serde_json::Value;
    use std::pin::Pin;

    type TestSink = Pin<Box<dyn Sink<Message, Error = String> + Send>>;
    type TestStream = Pin<Box<dyn Stream<Item = Result<Message, String>> + Send>>;

    /// Sink that forwards every written frame to a channel.
    fn channel_sink() -> (TestSink, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        let sink = futures_util::sink::unfold(tx, |tx, message: Message| async move {
            tx.send(message).map_err(|e| e.to_string())?;
            Ok::<_, String>(tx)
        });
        (Box::pin(sink), rx)
    }

    /// Sink whose writes never complete.
    fn stalled_sink() -> TestSink {
        let sink = futures_util::sink::unfold((), |(), _message: Message| async move {
            std::future::pending::<()>().await;
            Ok::<_, String>(())
        });
        Box::pin(sink)
    }

    /// Stream fed by the returned sender; dropping the sender ends it.
    fn channel_stream() -> (TestStream, mpsc::UnboundedSender<Result<Message, String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        (Box::pin(stream), tx)
    }

    fn text(message: &Message) -> Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    fn fast_settings() -> ConnectionSettings {
        ConnectionSettings {
            send_buffer_capacity: 8,
            write_wait: Duration::from_millis(200),
            pong_wait: Duration::from_secs(5),
            ping_period: Duration::from_secs(4),
            max_message_size: 512,
        }
    }

    #[test]
    fn test_state_transitions() {
        // テスト項目: 許可された状態遷移のみ有効と判定される
        use ConnectionState::*;
        assert!(Connecting.can_transition_to(Active));
        assert!(Active.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Active));
        assert!(!Active.can_transition_to(Connecting));
    }

    #[test]
    fn test_default_ping_period_shorter_than_pong_wait() {
        // テスト項目: デフォルトの ping 間隔は pong 待機時間より短い
        let settings = ConnectionSettings::default();

        assert!(settings.ping_period < settings.pong_wait);
        assert_eq!(settings.ping_period, Duration::from_secs(54));
    }

    #[tokio::test]
    async fn test_write_pump_sends_close_when_buffer_closes() {
        // テスト項目: バッファが閉じられると残りを送信した後 close フレームを送る
        // given (前提条件):
        let (sink, mut frames) = channel_sink();
        let (tx, rx) = mpsc::channel(4);
        tx.send(Utf8Bytes::from("queued".to_string())).await.unwrap();
        drop(tx);
        let liveness = Arc::new(Liveness::default());

        // when (操作):
        let exit = write_pump(sink, rx, fast_settings(), liveness.clone()).await;

        // then (期待する結果):
        assert_eq!(exit, WriteExit::BufferClosed);
        assert!(matches!(frames.recv().await, Some(Message::Text(t)) if t.as_str() == "queued"));
        assert!(matches!(frames.recv().await, Some(Message::Close(None))));
        assert!(liveness.last_write() > 0);
    }

    #[tokio::test]
    async fn test_write_pump_times_out_on_stalled_peer() {
        // テスト項目: 書き込みが期限を超えるとポンプが終了する
        let (tx, rx) = mpsc::channel(4);
        tx.send(Utf8Bytes::from("stuck".to_string())).await.unwrap();

        let exit = write_pump(stalled_sink(), rx, fast_settings(), Arc::new(Liveness::default())).await;

        assert_eq!(exit, WriteExit::Timeout);
    }

    #[tokio::test]
    async fn test_write_pump_sends_ping_on_interval() {
        // テスト項目: ping 間隔ごとに ping フレームを送る
        // given (前提条件):
        let (sink, mut frames) = channel_sink();
        let (_tx, rx) = mpsc::channel::<Utf8Bytes>(4);
        let settings = ConnectionSettings {
            ping_period: Duration::from_millis(50),
            ..fast_settings()
        };

        // when (操作):
        let pump = tokio::spawn(write_pump(sink, rx, settings, Arc::new(Liveness::default())));
        let frame = timeout(Duration::from_secs(2), frames.recv()).await.unwrap();
        pump.abort();

        // then (期待する結果):
        assert!(matches!(frame, Some(Message::Ping(_))));
    }

    #[tokio::test]
    async fn test_read_pump_deadline_without_pong() {
        // テスト項目: pong が届かないと読み取り期限切れで終了する
        let (hub, _task) = Hub::spawn(HubSettings::default(), test_support::empty_chats());
        let handle = test_support::handle("site-1", "a");
        let (stream, _tx) = channel_stream();
        let settings = ConnectionSettings {
            pong_wait: Duration::from_millis(100),
            ..fast_settings()
        };

        let exit = read_pump(stream, &hub, &handle, &settings, &Liveness::default()).await;

        assert_eq!(exit, ReadExit::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_read_pump_pong_extends_deadline() {
        // テスト項目: pong を受信すると読み取り期限が延長される
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubSettings::default(), test_support::empty_chats());
        let handle = test_support::handle("site-1", "a");
        let (stream, tx) = channel_stream();
        let settings = ConnectionSettings {
            pong_wait: Duration::from_millis(300),
            ..fast_settings()
        };
        let liveness = Liveness::default();
        let feeder = tokio::spawn(async move {
            for _ in 0..4 {
                tokio::time::sleep(Duration::from_millis(150)).await;
                tx.send(Ok(Message::Pong(Default::default()))).unwrap();
            }
            tx.send(Ok(Message::Close(None))).unwrap();
        });

        // when (操作): 合計 600ms 以上経過するが、pong が期限を延長し続ける
        let exit = read_pump(stream, &hub, &handle, &settings, &liveness).await;
        feeder.await.unwrap();

        // then (期待する結果):
        assert_eq!(exit, ReadExit::PeerClosed);
        assert!(liveness.last_pong() > 0);
    }

    #[tokio::test]
    async fn test_read_pump_rejects_oversized_message() {
        // テスト項目: サイズ上限を超えるメッセージは接続を終了させる
        let (hub, _task) = Hub::spawn(HubSettings::default(), test_support::empty_chats());
        let handle = test_support::handle("site-1", "a");
        let (stream, tx) = channel_stream();
        tx.send(Ok(Message::Text("x".repeat(600).into()))).unwrap();

        let exit = read_pump(stream, &hub, &handle, &fast_settings(), &Liveness::default()).await;

        assert_eq!(exit, ReadExit::MessageTooLarge(600));
    }

    #[tokio::test]
    async fn test_read_pump_transport_error() {
        // テスト項目: 読み取りエラーで終了する
        let (hub, _task) = Hub::spawn(HubSettings::default(), test_support::empty_chats());
        let handle = test_support::handle("site-1", "a");
        let (stream, tx) = channel_stream();
        tx.send(Err("connection reset".to_string())).unwrap();

        let exit = read_pump(stream, &hub, &handle, &fast_settings(), &Liveness::default()).await;

        assert_eq!(exit, ReadExit::Transport("connection reset".to_string()));
    }

    #[tokio::test]
    async fn test_connection_run_full_lifecycle() {
        // テスト項目: 登録 → メッセージ処理 → 切断 → 登録解除まで一通り動作する
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubSettings::default(), test_support::empty_chats());
        let connection = Connection::new(test_support::handle("site-1", "a"), fast_settings());
        let tenant = connection.handle().tenant.clone();
        assert_eq!(connection.state(), ConnectionState::Connecting);
        let (sink, mut frames) = channel_sink();
        let (stream, tx) = channel_stream();
        let run = tokio::spawn(connection.run(sink, stream, hub.clone()));

        // when (操作): 不正な JSON の後に ping を送る
        let established = frames.recv().await.unwrap();
        tx.send(Ok(Message::Text("{not json".into()))).unwrap();
        tx.send(Ok(Message::Text(r#"{"type":"ping"}"#.into()))).unwrap();
        let pong = frames.recv().await.unwrap();
        tx.send(Ok(Message::Close(None))).unwrap();
        let final_state = run.await.unwrap();

        // then (期待する結果):
        assert_eq!(text(&established)["type"], "connection_established");
        assert_eq!(text(&established)["data"]["session_id"], "a");
        assert_eq!(text(&pong)["type"], "pong");
        assert!(matches!(frames.recv().await, Some(Message::Close(None))));
        assert_eq!(final_state, ConnectionState::Closed);
        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.connections_for(&tenant), 0);
    }

    #[tokio::test]
    async fn test_connection_run_closed_by_hub() {
        // テスト項目: Hub が接続を閉じると close フレームが送られ、接続が終了する
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubSettings::default(), test_support::empty_chats());
        let connection = Connection::new(test_support::handle("site-1", "a"), fast_settings());
        let session_id = connection.handle().session_id.clone();
        let (sink, mut frames) = channel_sink();
        let (stream, _tx) = channel_stream();
        let run = tokio::spawn(connection.run(sink, stream, hub.clone()));
        frames.recv().await.unwrap();

        // when (操作):
        let closed = hub.close_session(session_id).await.unwrap();

        // then (期待する結果):
        assert!(closed);
        assert!(matches!(frames.recv().await, Some(Message::Close(None))));
        assert_eq!(run.await.unwrap(), ConnectionState::Closed);
    }
}

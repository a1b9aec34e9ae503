// Connection supervisor: owns the game socket and the reconnect timer.
//
// One task per game view. It forwards decoded server messages to the app loop
// as `ConnectionEvent`s, writes outbound commands to the socket, and every
// `reconnect_interval` reopens the socket if (and only if) it is down and a
// snapshot has been seen. Dropping every `CommandEmitter` tears the task down:
// the socket is closed and the timers go with it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codenames_core::command::{Command, WireFormat};
use codenames_core::protocol::{decode_server_message, RawSnapshot, ServerMessage};
use codenames_core::supervisor::{ConnectionState, TickAction};
use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("timed out after {timeout:?} connecting to {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("websocket handshake with {url} failed: {source}")]
    Handshake {
        url: String,
        #[source]
        source: Box<WsError>,
    },

    #[error("socket error: {0}")]
    Socket(String),
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// One open socket.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectError>;

    /// The next text frame. `None` once the socket has closed or failed.
    async fn next_text(&mut self) -> Option<String>;

    async fn close(&mut self);
}

/// Opens sockets. Swapped for an in-memory double in tests.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, ConnectError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, ConnectError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ConnectError::Handshake {
                url: url.to_string(),
                source: Box::new(e),
            })?;
        Ok(Box::new(TungsteniteTransport { stream }))
    }
}

pub struct TungsteniteTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ConnectError::Socket(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<String> {
        next_text_frame(&mut self.stream).await
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("error while closing socket: {e}");
        }
    }
}

/// Pull frames until a text payload arrives. Binary, ping and pong frames are
/// skipped; a close frame, an error or the end of the stream yields `None`.
///
/// Generic over the stream so it can be exercised without a socket.
pub async fn next_text_frame<St>(stream: &mut St) -> Option<String>
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Close(_)) => {
                info!("server sent close frame");
                return None;
            }
            Err(e) => {
                warn!("websocket error: {e}");
                return None;
            }
            _ => {
                // Binary, Ping, Pong, raw Frame.
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Events and options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The socket is open.
    Connected,
    /// The socket closed; recovery is automatic once a snapshot has been seen.
    Disconnected,
    /// The very first connection attempt failed. No retry follows.
    ConnectFailed(String),
    Snapshot(RawSnapshot),
    /// The server refused the game (`{"error": ...}`).
    ServerError(String),
    /// A message arrived that is neither a game nor an error document.
    ProtocolError { text: String, reason: String },
    /// A command left the queue but never reached the socket.
    CommandDropped(Command),
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub reconnect_interval: Duration,
    pub connect_timeout: Duration,
    pub heartbeat: Option<Duration>,
    pub wire_format: WireFormat,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        SupervisorOptions {
            reconnect_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            heartbeat: None,
            wire_format: WireFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Command emitter
// ---------------------------------------------------------------------------

/// Fire-and-forget handle for outbound commands. Cloneable; when the last
/// clone is dropped the supervisor shuts down.
#[derive(Debug, Clone)]
pub struct CommandEmitter {
    tx: mpsc::Sender<Command>,
}

impl CommandEmitter {
    pub fn new(tx: mpsc::Sender<Command>) -> Self {
        CommandEmitter { tx }
    }

    /// Queue `command` for the socket. Returns false if the supervisor is
    /// gone or its queue is full; the command is dropped either way.
    pub fn emit(&self, command: Command) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(command)) => {
                warn!(%command, "outbound queue full, dropping command");
                false
            }
            Err(mpsc::error::TrySendError::Closed(command)) => {
                warn!(%command, "connection supervisor has stopped, dropping command");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

pub struct Supervisor {
    url: Url,
    connector: Arc<dyn Connector>,
    options: SupervisorOptions,
    state: ConnectionState,
    transport: Option<Box<dyn Transport>>,
    events: mpsc::Sender<ConnectionEvent>,
}

impl Supervisor {
    pub fn new(
        url: Url,
        connector: Arc<dyn Connector>,
        options: SupervisorOptions,
        events: mpsc::Sender<ConnectionEvent>,
    ) -> Self {
        Supervisor {
            url,
            connector,
            options,
            state: ConnectionState::new(),
            transport: None,
            events,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some() && self.state.is_connected()
    }

    pub fn latest_snapshot(&self) -> Option<&RawSnapshot> {
        self.state.last_snapshot()
    }

    /// Spawn the supervisor on the runtime and hand back the command side.
    pub fn spawn(self) -> (CommandEmitter, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(self.run(rx));
        (CommandEmitter::new(tx), handle)
    }

    /// Open the socket unless it is already open.
    pub async fn reconnect(&mut self) -> Result<(), ConnectError> {
        if self.is_connected() {
            return Ok(());
        }

        let attempt = tokio::time::timeout(
            self.options.connect_timeout,
            self.connector.connect(&self.url),
        )
        .await;
        let result = match attempt {
            Ok(result) => result,
            Err(_) => Err(ConnectError::Timeout {
                url: self.url.to_string(),
                timeout: self.options.connect_timeout,
            }),
        };

        match result {
            Ok(transport) => {
                info!(url = %self.url, reconnects = self.state.reconnects(), "socket open");
                self.transport = Some(transport);
                self.state.on_open();
                emit(&self.events, ConnectionEvent::Connected).await;
                Ok(())
            }
            Err(e) => {
                self.transport = None;
                self.state.on_closed();
                if self.state.last_snapshot().is_none() {
                    warn!(url = %self.url, "could not connect: {e}");
                    emit(&self.events, ConnectionEvent::ConnectFailed(e.to_string())).await;
                } else {
                    debug!(url = %self.url, "reconnect attempt failed: {e}");
                }
                Err(e)
            }
        }
    }

    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(url = %self.url, "connection supervisor starting");
        let _ = self.reconnect().await;

        let mut ticker = periodic(self.options.reconnect_interval);
        let mut heartbeat = self.options.heartbeat.map(periodic);

        loop {
            let keep_going = tokio::select! {
                frame = next_frame(&mut self.transport) => {
                    match frame {
                        Some(text) => self.handle_text(text).await,
                        None => self.on_socket_closed().await,
                    }
                }

                command = commands.recv() => {
                    match command {
                        Some(command) => self.send(command).await,
                        None => {
                            debug!("command channel closed, tearing down");
                            false
                        }
                    }
                }

                _ = ticker.tick() => {
                    if self.state.on_tick() == TickAction::Reconnect {
                        debug!(attempt = self.state.reconnects(), "reconnecting");
                        let _ = self.reconnect().await;
                    }
                    true
                }

                _ = maybe_tick(&mut heartbeat) => {
                    if self.is_connected() {
                        self.send(Command::Heartbeat).await
                    } else {
                        true
                    }
                }
            };
            if !keep_going {
                break;
            }
        }

        self.close().await;
        info!("connection supervisor stopped");
    }

    async fn handle_text(&mut self, text: String) -> bool {
        match decode_server_message(&text) {
            Ok(ServerMessage::Snapshot(raw)) => {
                debug!(bytes = text.len(), "snapshot received");
                self.state.on_snapshot(raw.clone());
                emit(&self.events, ConnectionEvent::Snapshot(raw)).await
            }
            Ok(ServerMessage::Error { reason }) => {
                warn!(%reason, "server refused the game");
                emit(&self.events, ConnectionEvent::ServerError(reason)).await
            }
            Err(e) => {
                warn!("failed to decode server message: {e}; raw: {text}");
                let reason = e.to_string();
                emit(&self.events, ConnectionEvent::ProtocolError { text, reason }).await
            }
        }
    }

    async fn on_socket_closed(&mut self) -> bool {
        info!(url = %self.url, "socket closed");
        self.transport = None;
        self.state.on_closed();
        emit(&self.events, ConnectionEvent::Disconnected).await
    }

    /// Write one command. A command that cannot be written is reported back
    /// so its lock can be released. Returns false once nobody is listening.
    async fn send(&mut self, command: Command) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            warn!(%command, "not connected, dropping command");
            return report_dropped(&self.events, command).await;
        };
        let text = command.encode(self.options.wire_format);
        debug!(%text, "sending command");
        if let Err(e) = transport.send_text(text).await {
            warn!(%command, "send failed: {e}");
            return self.on_socket_closed().await && report_dropped(&self.events, command).await;
        }
        true
    }

    async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.state.on_closed();
    }
}

/// Forward an event to the app loop. False once nobody is listening.
async fn emit(events: &mpsc::Sender<ConnectionEvent>, event: ConnectionEvent) -> bool {
    events.send(event).await.is_ok()
}

async fn report_dropped(events: &mpsc::Sender<ConnectionEvent>, command: Command) -> bool {
    if command == Command::Heartbeat {
        return true;
    }
    emit(events, ConnectionEvent::CommandDropped(command)).await
}

/// An interval whose first tick is one period from now, skipping missed ticks.
fn periodic(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_frame(transport: &mut Option<Box<dyn Transport>>) -> Option<String> {
    match transport {
        Some(transport) => transport.next_text().await,
        None => std::future::pending().await,
    }
}

async fn maybe_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SNAPSHOT: &str = r#"{"status": "running", "whoseTurn": "red"}"#;

    // -- Mock transport -----------------------------------------------------

    /// Test-side handle for one scripted socket.
    struct Remote {
        frames: mpsc::UnboundedSender<Option<String>>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl Remote {
        fn push(&self, text: &str) {
            self.frames.send(Some(text.to_string())).unwrap();
        }

        fn hang_up(&self) {
            self.frames.send(None).unwrap();
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    struct MockTransport {
        frames: mpsc::UnboundedReceiver<Option<String>>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send_text(&mut self, text: String) -> Result<(), ConnectError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn next_text(&mut self) -> Option<String> {
            match self.frames.recv().await {
                Some(frame) => frame,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Hands out pre-built sockets in order; refuses once they run out.
    struct MockConnector {
        sockets: Mutex<VecDeque<MockTransport>>,
        attempts: AtomicUsize,
        hang: bool,
    }

    impl MockConnector {
        fn new(count: usize) -> (Arc<Self>, Vec<Remote>) {
            let mut sockets = VecDeque::new();
            let mut remotes = Vec::new();
            for _ in 0..count {
                let (tx, rx) = mpsc::unbounded_channel();
                let sent = Arc::new(Mutex::new(Vec::new()));
                let closed = Arc::new(AtomicBool::new(false));
                sockets.push_back(MockTransport {
                    frames: rx,
                    sent: Arc::clone(&sent),
                    closed: Arc::clone(&closed),
                });
                remotes.push(Remote {
                    frames: tx,
                    sent,
                    closed,
                });
            }
            let connector = MockConnector {
                sockets: Mutex::new(sockets),
                attempts: AtomicUsize::new(0),
                hang: false,
            };
            (Arc::new(connector), remotes)
        }

        fn hanging() -> Arc<Self> {
            Arc::new(MockConnector {
                sockets: Mutex::new(VecDeque::new()),
                attempts: AtomicUsize::new(0),
                hang: true,
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, _url: &Url) -> Result<Box<dyn Transport>, ConnectError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            let next = self.sockets.lock().unwrap().pop_front();
            match next {
                Some(transport) => Ok(Box::new(transport)),
                None => Err(ConnectError::Socket("connection refused".into())),
            }
        }
    }

    fn start(
        connector: Arc<MockConnector>,
        options: SupervisorOptions,
    ) -> (CommandEmitter, JoinHandle<()>, mpsc::Receiver<ConnectionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let url = Url::parse("ws://localhost:8080/ws?gameID=ABC").unwrap();
        let supervisor = Supervisor::new(url, connector, options, event_tx);
        let (emitter, handle) = supervisor.spawn();
        (emitter, handle, event_rx)
    }

    fn snapshot_event() -> ConnectionEvent {
        match decode_server_message(SNAPSHOT).unwrap() {
            ServerMessage::Snapshot(raw) => ConnectionEvent::Snapshot(raw),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    // -- Frame filtering ----------------------------------------------------

    #[tokio::test]
    async fn text_frames_pass_and_control_frames_are_skipped() {
        let mut frames = stream::iter(vec![
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Ping(vec![].into())),
            Ok(Message::Pong(vec![].into())),
            Ok(Message::Text("hello".into())),
            Ok(Message::Close(None)),
            Ok(Message::Text("after close".into())),
        ]);
        assert_eq!(next_text_frame(&mut frames).await, Some("hello".into()));
        assert_eq!(next_text_frame(&mut frames).await, None);
    }

    #[tokio::test]
    async fn socket_error_ends_the_stream() {
        let mut frames = stream::iter(vec![Err(WsError::ConnectionClosed)]);
        assert_eq!(next_text_frame(&mut frames).await, None);
    }

    // -- Supervisor ---------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn scenario_c_reconnects_one_interval_after_a_drop() {
        let (connector, remotes) = MockConnector::new(2);
        let (_emitter, _handle, mut events) = start(connector.clone(), SupervisorOptions::default());

        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));
        remotes[0].push(SNAPSHOT);
        assert_eq!(events.recv().await, Some(snapshot_event()));

        remotes[0].hang_up();
        assert_eq!(events.recv().await, Some(ConnectionEvent::Disconnected));
        let dropped_at = Instant::now();

        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));
        assert!(dropped_at.elapsed() <= Duration::from_secs(1));
        assert_eq!(connector.attempts(), 2);

        // Connected again: further ticks do nothing.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_reconnect_without_a_snapshot() {
        let (connector, remotes) = MockConnector::new(2);
        let (_emitter, _handle, mut events) = start(connector.clone(), SupervisorOptions::default());

        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));
        remotes[0].hang_up();
        assert_eq!(events.recv().await, Some(ConnectionEvent::Disconnected));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.attempts(), 1);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_connect_is_reported_and_not_retried() {
        let (connector, _remotes) = MockConnector::new(0);
        let (_emitter, _handle, mut events) = start(connector.clone(), SupervisorOptions::default());

        match events.recv().await {
            Some(ConnectionEvent::ConnectFailed(reason)) => {
                assert!(reason.contains("refused"));
            }
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_connect_times_out() {
        let connector = MockConnector::hanging();
        let options = SupervisorOptions {
            connect_timeout: Duration::from_secs(2),
            ..SupervisorOptions::default()
        };
        let (_emitter, _handle, mut events) = start(connector, options);

        match events.recv().await {
            Some(ConnectionEvent::ConnectFailed(reason)) => {
                assert!(reason.contains("timed out"), "{reason}");
            }
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reconnects_keep_retrying_every_interval() {
        let (connector, remotes) = MockConnector::new(1);
        let (_emitter, _handle, mut events) = start(connector.clone(), SupervisorOptions::default());

        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));
        remotes[0].push(SNAPSHOT);
        events.recv().await;
        remotes[0].hang_up();
        assert_eq!(events.recv().await, Some(ConnectionEvent::Disconnected));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        // One initial connect plus one attempt per elapsed tick.
        assert_eq!(connector.attempts(), 4);
        // Later failures are not surfaced as events.
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_encoded_on_the_wire() {
        let (connector, remotes) = MockConnector::new(1);
        let options = SupervisorOptions {
            wire_format: WireFormat::JsonAction,
            ..SupervisorOptions::default()
        };
        let (emitter, _handle, mut events) = start(connector, options);
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));

        assert!(emitter.emit(Command::Guess {
            card: "APPLE".into()
        }));
        assert!(emitter.emit(Command::EndTurn));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            remotes[0].sent(),
            vec![
                r#"{"Action":"Guess APPLE"}"#.to_string(),
                r#"{"Action":"EndTurn"}"#.to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_is_sent_on_its_interval() {
        let (connector, remotes) = MockConnector::new(1);
        let options = SupervisorOptions {
            heartbeat: Some(Duration::from_secs(15)),
            ..SupervisorOptions::default()
        };
        let (_emitter, _handle, mut events) = start(connector, options);
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert!(remotes[0].sent().is_empty());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(remotes[0].sent(), vec!["HeartBeat".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_document_is_forwarded() {
        let (connector, remotes) = MockConnector::new(1);
        let (_emitter, _handle, mut events) = start(connector, SupervisorOptions::default());
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));

        remotes[0].push(r#"{"error": "could not find game"}"#);
        assert_eq!(
            events.recv().await,
            Some(ConnectionEvent::ServerError("could not find game".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_messages_are_reported() {
        let (connector, remotes) = MockConnector::new(1);
        let (_emitter, _handle, mut events) = start(connector, SupervisorOptions::default());
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));

        let no_status = r#"{"BaseGame": {"TeamRed": ["Alice"], "Cards": {}}}"#;
        remotes[0].push(no_status);
        remotes[0].push("garbage");
        remotes[0].push(SNAPSHOT);

        match events.recv().await {
            Some(ConnectionEvent::ProtocolError { text, reason }) => {
                assert_eq!(text, no_status);
                assert!(!reason.is_empty());
            }
            other => panic!("expected ProtocolError, got {other:?}"),
        }
        assert!(matches!(
            events.recv().await,
            Some(ConnectionEvent::ProtocolError { ref text, .. }) if text == "garbage"
        ));
        // The socket stays up and later games still come through.
        assert_eq!(events.recv().await, Some(snapshot_event()));
    }

    #[tokio::test(start_paused = true)]
    async fn command_without_a_socket_is_reported_dropped() {
        let (connector, remotes) = MockConnector::new(1);
        let options = SupervisorOptions {
            heartbeat: Some(Duration::from_millis(100)),
            ..SupervisorOptions::default()
        };
        let (emitter, _handle, mut events) = start(connector, options);
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));
        remotes[0].push(SNAPSHOT);
        assert_eq!(events.recv().await, Some(snapshot_event()));
        remotes[0].hang_up();
        assert_eq!(events.recv().await, Some(ConnectionEvent::Disconnected));

        let guess = Command::Guess {
            card: "APPLE".into(),
        };
        assert!(emitter.emit(guess.clone()));
        assert_eq!(events.recv().await, Some(ConnectionEvent::CommandDropped(guess)));
        // Heartbeats are only sent while connected and never reported.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn losing_the_listener_closes_the_socket() {
        let (connector, remotes) = MockConnector::new(1);
        let (_emitter, handle, mut events) = start(connector, SupervisorOptions::default());
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));

        drop(events);
        remotes[0].push(SNAPSHOT);
        handle.await.unwrap();
        assert!(remotes[0].closed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_emitter_closes_the_socket() {
        let (connector, remotes) = MockConnector::new(1);
        let (emitter, handle, mut events) = start(connector, SupervisorOptions::default());
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));

        drop(emitter);
        handle.await.unwrap();
        assert!(remotes[0].closed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_is_a_no_op_while_connected() {
        let (connector, _remotes) = MockConnector::new(2);
        let (event_tx, mut events) = mpsc::channel(8);
        let url = Url::parse("ws://localhost:8080/ws").unwrap();
        let mut supervisor =
            Supervisor::new(url, connector.clone(), SupervisorOptions::default(), event_tx);

        supervisor.reconnect().await.unwrap();
        supervisor.reconnect().await.unwrap();
        supervisor.reconnect().await.unwrap();
        assert!(supervisor.is_connected());
        assert_eq!(connector.attempts(), 1);
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));
        assert!(events.try_recv().is_err());
        assert!(supervisor.latest_snapshot().is_none());
    }

    #[test]
    fn emitter_reports_a_stopped_supervisor() {
        let (tx, rx) = mpsc::channel(1);
        let emitter = CommandEmitter::new(tx);
        assert!(emitter.emit(Command::EndTurn));
        // Queue of one is now full.
        assert!(!emitter.emit(Command::EndTurn));
        drop(rx);
        assert!(!emitter.emit(Command::EndTurn));
    }
}

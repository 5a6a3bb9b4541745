//! Bridges a transport-free [`TurnSession`] to a real UDP socket facing
//! the TURN server, plus the RFC 6062 peer-TCP data-connection pool used
//! when a relayed allocation talks TCP to its peer. Mirrors how the
//! sibling SIP transport layer separates a socket-owning actor task
//! (receive loop + sender) from the protocol state machine it drives,
//! and implements `infra_common::lifecycle::Component` the way the
//! endpoint and transport manager do.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use infra_common::errors::types::Error as InfraError;
use infra_common::lifecycle::component::{Component, ComponentState};
use infra_common::lifecycle::group_lock::GroupLock;
use infra_common::logging::metrics::{Metric, MetricsCollector};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::channel_data::ChannelData;
use crate::error::{Error, Result};
use crate::session::{Action, SessionEvent, TurnSession};
use crate::stun::{looks_like_stun, Message as StunMessage};

const DEFAULT_EVENT_CAPACITY: usize = 100;

/// RFC 6062 §4: a client keeps a small pool of TCP connections to its
/// relay ready for CONNECT/ConnectionBind, rather than dialing fresh for
/// every peer.
pub const DEFAULT_DATA_CONNECTION_POOL: usize = 4;
pub const MAX_DATA_CONNECTION_POOL: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    InitSock,
    ConnBinding,
    Ready,
}

struct PeerConnection {
    state: PeerConnectionState,
    connection_id: u32,
    stream: Option<Arc<Mutex<TcpStream>>>,
}

/// The RFC 6062 peer-data-connection pool: one `TcpStream` per active
/// peer relay, capped at [`MAX_DATA_CONNECTION_POOL`].
#[derive(Default)]
struct DataConnectionPool {
    connections: HashMap<u32, PeerConnection>,
}

impl DataConnectionPool {
    fn len(&self) -> usize {
        self.connections.len()
    }

    fn insert(&mut self, connection_id: u32) -> Result<()> {
        if self.connections.len() >= MAX_DATA_CONNECTION_POOL {
            return Err(Error::Resource("peer data-connection pool is full".to_string()));
        }
        self.connections.insert(connection_id, PeerConnection { state: PeerConnectionState::InitSock, connection_id, stream: None });
        Ok(())
    }

    fn mark_binding(&mut self, connection_id: u32) {
        if let Some(conn) = self.connections.get_mut(&connection_id) {
            conn.state = PeerConnectionState::ConnBinding;
        }
    }

    fn mark_ready(&mut self, connection_id: u32, stream: TcpStream) {
        if let Some(conn) = self.connections.get_mut(&connection_id) {
            conn.state = PeerConnectionState::Ready;
            conn.stream = Some(Arc::new(Mutex::new(stream)));
        }
    }

    fn remove(&mut self, connection_id: u32) {
        self.connections.remove(&connection_id);
    }
}

enum Command {
    SendToPeer { peer: SocketAddr, data: Bytes },
    CreatePermission { peer: SocketAddr },
    BindChannel { peer: SocketAddr },
    RetransmitTimer { name: &'static str },
    RefreshTimer,
    OpenPeerConnection { relay: SocketAddr },
    Close,
}

const METRIC_BYTES_SENT: &str = "turn.bytes_sent";
const METRIC_BYTES_RECEIVED: &str = "turn.bytes_received";
const METRIC_RETRANSMITS: &str = "turn.retransmits";
const METRIC_LAST_ACTIVITY_MS: &str = "turn.last_activity_unix_ms";

fn register_metrics(collector: &MetricsCollector, component: &str) {
    collector.register(Metric::counter(METRIC_BYTES_SENT, component).with_description("bytes sent to the TURN server"));
    collector.register(Metric::counter(METRIC_BYTES_RECEIVED, component).with_description("bytes received from the TURN server"));
    collector.register(Metric::counter(METRIC_RETRANSMITS, component).with_description("STUN request retransmissions"));
    collector.register(Metric::gauge(METRIC_LAST_ACTIVITY_MS, component).with_description("wall-clock time of the last socket activity"));
}

fn mark_activity(collector: &MetricsCollector) {
    if let Ok(now) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        collector.set_gauge(METRIC_LAST_ACTIVITY_MS, now.as_millis() as f64);
    }
}

/// A live TURN client allocation: owns the UDP socket to the TURN
/// server, drives [`TurnSession`]'s state machine, forwards
/// [`SessionEvent`]s to the caller, and exposes the standard
/// init/start/stop/shutdown lifecycle every long-lived object in this
/// engine implements.
pub struct TurnSocket {
    name: String,
    state: ComponentState,
    server: SocketAddr,
    event_capacity: usize,
    group_lock: GroupLock,
    metrics: MetricsCollector,
    closed: Arc<AtomicBool>,
    command_tx: Option<mpsc::Sender<Command>>,
    credentials: Option<(String, String)>,
    // Populated by `init`, consumed by `start`.
    staged: Option<StagedActor>,
}

struct StagedActor {
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    command_rx: mpsc::Receiver<Command>,
    socket: Arc<UdpSocket>,
}

impl TurnSocket {
    pub fn new(server: SocketAddr, event_capacity: Option<usize>) -> Self {
        TurnSocket {
            name: format!("turn-socket-{server}"),
            state: ComponentState::Created,
            server,
            event_capacity: event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY),
            group_lock: GroupLock::new(),
            metrics: MetricsCollector::new(),
            closed: Arc::new(AtomicBool::new(false)),
            command_tx: None,
            credentials: None,
            staged: None,
        }
    }

    /// Supplies the long-term-credential username/password this
    /// allocation authenticates with once the server challenges it with
    /// a 401/438. Has no effect after [`Component::start`] has already
    /// constructed the session; call it between `new` and `start`.
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.credentials = Some((username.into(), password.into()));
    }

    /// `new` + `init` + `start` in one call, for callers that don't need
    /// fine-grained lifecycle control over the three steps.
    pub async fn connect(server: SocketAddr, event_capacity: Option<usize>) -> Result<(Self, mpsc::Receiver<SessionEvent>)> {
        let mut socket = Self::new(server, event_capacity);
        socket.init().await.map_err(|e| Error::Transport(e.to_string()))?;
        let events_rx = socket.staged.as_mut().expect("init populates staged").events_rx_take();
        socket.start().await.map_err(|e| Error::Transport(e.to_string()))?;
        Ok((socket, events_rx))
    }

    /// Snapshot of this socket's byte counters and last-activity gauge
    /// (RFC-silent, modeled on `pjnath`'s `turn_sock` statistics).
    pub fn stats(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    pub async fn send_to_peer(&self, peer: SocketAddr, data: Bytes) -> Result<()> {
        self.send_command(Command::SendToPeer { peer, data }).await
    }

    pub async fn create_permission(&self, peer: SocketAddr) -> Result<()> {
        self.send_command(Command::CreatePermission { peer }).await
    }

    pub async fn bind_channel(&self, peer: SocketAddr) -> Result<()> {
        self.send_command(Command::BindChannel { peer }).await
    }

    /// Opens a pooled RFC 6062 TCP connection toward the relay for a
    /// peer-TCP data path; the result arrives as a
    /// [`SessionEvent::PeerConnectionOpened`]/`PeerConnectionFailed` on
    /// the event stream rather than as this call's return value, since
    /// the dial itself happens inside the session actor.
    pub async fn open_peer_connection(&self, relay: SocketAddr) -> Result<()> {
        self.send_command(Command::OpenPeerConnection { relay }).await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    async fn send_command(&self, command: Command) -> Result<()> {
        let Some(tx) = &self.command_tx else {
            return Err(Error::Transport("TURN socket has not been started".to_string()));
        };
        if self.is_closed() {
            return Err(Error::Transport("TURN socket is closed".to_string()));
        }
        tx.send(command).await.map_err(|_| Error::Transport("TURN session actor has stopped".to_string()))
    }
}

impl StagedActor {
    fn events_rx_take(&mut self) -> mpsc::Receiver<SessionEvent> {
        std::mem::replace(&mut self.events_rx, mpsc::channel(1).1)
    }
}

impl Drop for TurnSocket {
    fn drop(&mut self) {
        self.group_lock.release();
    }
}

#[async_trait]
impl Component for TurnSocket {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ComponentState {
        self.state
    }

    async fn init(&mut self) -> std::result::Result<(), InfraError> {
        if self.state != ComponentState::Created {
            return Ok(());
        }
        register_metrics(&self.metrics, &self.name);
        let (events_tx, events_rx) = mpsc::channel(self.event_capacity);
        let (command_tx, command_rx) = mpsc::channel(self.event_capacity);

        let local_addr: SocketAddr = if self.server.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" }.parse().unwrap();
        let socket = UdpSocket::bind(local_addr).await.map_err(|e| InfraError::Internal(e.to_string()))?;

        self.command_tx = Some(command_tx);
        self.staged = Some(StagedActor { events_tx, events_rx, command_rx, socket: Arc::new(socket) });
        self.state = ComponentState::Initialized;
        Ok(())
    }

    async fn start(&mut self) -> std::result::Result<(), InfraError> {
        if self.state != ComponentState::Initialized {
            return Err(InfraError::ComponentNotReady(self.name.clone()));
        }
        let staged = self.staged.take().ok_or_else(|| InfraError::ComponentNotReady(self.name.clone()))?;
        let command_tx = self.command_tx.clone().ok_or_else(|| InfraError::ComponentNotReady(self.name.clone()))?;

        let closed_on_destroy = self.closed.clone();
        self.group_lock.add_destroy_handler(move || {
            closed_on_destroy.store(true, Ordering::Relaxed);
        });

        let mut session = TurnSession::new(self.server);
        if let Some((username, password)) = self.credentials.take() {
            session.set_credentials(username, password);
        }
        let actor = SessionActor {
            session,
            socket: staged.socket,
            server: self.server,
            events_tx: staged.events_tx,
            command_tx,
            closed: self.closed.clone(),
            metrics: self.metrics.clone(),
            pending_message: None,
            data_pool: DataConnectionPool::default(),
            next_connection_id: 0,
        };
        actor.spawn(staged.command_rx);
        self.state = ComponentState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> std::result::Result<(), InfraError> {
        self.closed.store(true, Ordering::Relaxed);
        if let Some(tx) = &self.command_tx {
            let _ = tx.send(Command::Close).await;
        }
        self.state = ComponentState::Stopped;
        Ok(())
    }

    async fn shutdown(&mut self) -> std::result::Result<(), InfraError> {
        self.stop().await?;
        self.state = ComponentState::ShutDown;
        Ok(())
    }
}

/// Owns the actual `TurnSession` and runs the receive loop plus the
/// command-processing loop as two halves of one task.
struct SessionActor {
    session: TurnSession,
    socket: Arc<UdpSocket>,
    server: SocketAddr,
    events_tx: mpsc::Sender<SessionEvent>,
    command_tx: mpsc::Sender<Command>,
    closed: Arc<AtomicBool>,
    metrics: MetricsCollector,
    pending_message: Option<StunMessage>,
    data_pool: DataConnectionPool,
    next_connection_id: u32,
}

impl SessionActor {
    fn spawn(mut self, mut command_rx: mpsc::Receiver<Command>) {
        tokio::spawn(async move {
            let actions = self.session.start();
            self.apply(actions).await;

            let mut recv_buf = vec![0u8; 65_535];
            loop {
                if self.closed.load(Ordering::Relaxed) {
                    break;
                }
                tokio::select! {
                    datagram = self.socket.recv_from(&mut recv_buf) => {
                        match datagram {
                            Ok((len, from)) => {
                                if from != self.server {
                                    warn!("dropping datagram from unexpected peer {from}, expected TURN server {}", self.server);
                                    continue;
                                }
                                self.metrics.increment(METRIC_BYTES_RECEIVED, len as f64);
                                mark_activity(&self.metrics);
                                self.handle_datagram(&recv_buf[..len]).await;
                            }
                            Err(e) => {
                                infra_common::log_error_record!("transport", format!("TURN server socket read error: {e}"));
                                let _ = self.events_tx.send(SessionEvent::AllocationFailed { reason: e.to_string() }).await;
                                break;
                            }
                        }
                    }
                    command = command_rx.recv() => {
                        match command {
                            Some(Command::Close) | None => break,
                            Some(command) => self.handle_command(command).await,
                        }
                    }
                }
            }
            debug!("TURN session actor for server {} terminated", self.server);
        });
    }

    async fn handle_datagram(&mut self, bytes: &[u8]) {
        if !looks_like_stun(bytes[0]) {
            let frame = match ChannelData::decode_datagram(Bytes::copy_from_slice(bytes)) {
                Ok(f) => f,
                Err(e) => {
                    warn!("malformed ChannelData frame from TURN server: {e}");
                    return;
                }
            };
            if let Some(peer) = self.session.tables.peer_for_channel(frame.channel, Instant::now()) {
                let _ = self.events_tx.send(SessionEvent::DataFromPeer { peer, data: frame.data.to_vec() }).await;
            }
            return;
        }

        let message = match StunMessage::decode(Bytes::copy_from_slice(bytes)) {
            Ok(m) => m,
            Err(e) => {
                warn!("malformed STUN message from TURN server: {e}");
                return;
            }
        };

        let result = match message.msg_type.method {
            crate::stun::Method::Allocate => self.session.on_allocate_response(message, Instant::now()),
            crate::stun::Method::Refresh => self.session.on_refresh_response(message),
            crate::stun::Method::Data => {
                if let Ok(Some((peer, data))) = self.session.on_data_indication(&message) {
                    let _ = self.events_tx.send(SessionEvent::DataFromPeer { peer, data }).await;
                }
                Ok(vec![])
            }
            crate::stun::Method::CreatePermission => self.session.on_create_permission_response(message, Instant::now()),
            crate::stun::Method::ChannelBind => Ok(self.session.on_channel_bind_response(message)),
            _ => Ok(vec![]),
        };

        match result {
            Ok(actions) => self.apply(actions).await,
            Err(e) => {
                infra_common::log_error_record!("protocol", format!("TURN session error: {e}"));
                let _ = self.events_tx.send(SessionEvent::AllocationFailed { reason: e.to_string() }).await;
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SendToPeer { peer, data } => {
                let Some(channel) = self.session.tables.channel_for_peer(peer, Instant::now()) else {
                    warn!("no channel bound to {peer} yet, dropping send");
                    return;
                };
                let frame = ChannelData::new(channel, data);
                let bytes = frame.encode();
                if self.socket.send_to(&bytes, self.server).await.is_ok() {
                    self.metrics.increment(METRIC_BYTES_SENT, bytes.len() as f64);
                    mark_activity(&self.metrics);
                }
            }
            Command::CreatePermission { peer } => {
                let actions = self.session.build_create_permission(peer);
                self.apply(actions).await;
            }
            Command::BindChannel { peer } => {
                match self.session.build_channel_bind(peer, Instant::now()) {
                    Ok((_channel, actions)) => self.apply(actions).await,
                    Err(e) => {
                        let _ = self.events_tx.send(SessionEvent::AllocationFailed { reason: e.to_string() }).await;
                    }
                }
            }
            Command::RetransmitTimer { name } => {
                let Some(pending) = self.pending_message.clone() else { return };
                match self.session.on_retransmit_timer(name, &pending) {
                    Ok(actions) => {
                        self.metrics.increment(METRIC_RETRANSMITS, 1.0);
                        self.apply(actions).await;
                    }
                    Err(e) => {
                        infra_common::log_error_record!("timeout", format!("TURN {name} exhausted its retransmit budget: {e}"));
                        let _ = self.events_tx.send(SessionEvent::AllocationFailed { reason: e.to_string() }).await;
                        self.closed.store(true, Ordering::Relaxed);
                    }
                }
            }
            Command::RefreshTimer => {
                let actions = self.session.build_refresh(false);
                self.apply(actions).await;
            }
            Command::OpenPeerConnection { relay } => match self.open_peer_connection(relay).await {
                Ok(connection_id) => {
                    let _ = self.events_tx.send(SessionEvent::PeerConnectionOpened { connection_id, relay }).await;
                }
                Err(e) => {
                    let _ = self.events_tx.send(SessionEvent::PeerConnectionFailed { relay, reason: e.to_string() }).await;
                }
            },
            Command::Close => {}
        }
    }

    async fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SendTo { server, message } => {
                    self.pending_message = Some((*message).clone());
                    let bytes = message.encode();
                    match self.socket.send_to(&bytes, server).await {
                        Ok(_) => {
                            self.metrics.increment(METRIC_BYTES_SENT, bytes.len() as f64);
                            mark_activity(&self.metrics);
                        }
                        Err(e) => infra_common::log_error_record!("transport", format!("failed sending to TURN server {server}: {e}")),
                    }
                }
                Action::ArmRetransmit { name, after } => {
                    let tx = self.command_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(Command::RetransmitTimer { name }).await;
                    });
                }
                Action::CancelRetransmit { .. } => {
                    self.pending_message = None;
                }
                Action::ArmRefresh { after } => {
                    let tx = self.command_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(Command::RefreshTimer).await;
                    });
                }
                Action::Emit(event) => {
                    let _ = self.events_tx.send(event).await;
                }
            }
        }
    }

    /// Opens a new pooled TCP connection toward the TURN server for a
    /// RFC 6062 CONNECT/ConnectionBind exchange, up to the pool cap.
    async fn open_peer_connection(&mut self, relay: SocketAddr) -> Result<u32> {
        if self.data_pool.len() >= MAX_DATA_CONNECTION_POOL {
            return Err(Error::Resource("peer data-connection pool is full".to_string()));
        }
        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;
        self.data_pool.insert(connection_id)?;
        let stream = TcpStream::connect(relay).await.map_err(|e| Error::Transport(e.to_string()))?;
        self.data_pool.mark_binding(connection_id);
        self.data_pool.mark_ready(connection_id, stream);
        Ok(connection_id)
    }
}

/// Decodes a sequence of ChannelData frames off a TCP/TLS byte stream,
/// where (unlike UDP) frames are padded to 4-byte boundaries and
/// multiple frames may share one read.
pub fn decode_stream_frames(buf: &[u8]) -> Result<(Vec<ChannelData>, usize)> {
    let mut frames = Vec::new();
    let mut offset = 0;
    while let Some((frame, consumed)) = ChannelData::decode_stream(&buf[offset..])? {
        frames.push(frame);
        offset += consumed;
    }
    Ok((frames, offset))
}

/// Registry of live allocations keyed by their relayed address, for
/// callers (an ICE agent, a media relay) juggling more than one
/// concurrent `TurnSocket`. Mirrors the `DashMap`-table convention the
/// transaction and dialog layers use for their own live-object tables.
#[derive(Default)]
pub struct TurnSocketRegistry {
    sockets: DashMap<SocketAddr, Arc<TurnSocket>>,
}

impl TurnSocketRegistry {
    pub fn new() -> Self {
        TurnSocketRegistry::default()
    }

    pub fn register(&self, relayed_address: SocketAddr, socket: Arc<TurnSocket>) {
        self.sockets.insert(relayed_address, socket);
    }

    pub fn get(&self, relayed_address: SocketAddr) -> Option<Arc<TurnSocket>> {
        self.sockets.get(&relayed_address).map(|entry| entry.clone())
    }

    pub fn remove(&self, relayed_address: SocketAddr) -> Option<Arc<TurnSocket>> {
        self.sockets.remove(&relayed_address).map(|(_, socket)| socket)
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn data_connection_pool_rejects_past_the_cap() {
        let mut pool = DataConnectionPool::default();
        for i in 0..MAX_DATA_CONNECTION_POOL as u32 {
            pool.insert(i).unwrap();
        }
        assert!(pool.insert(MAX_DATA_CONNECTION_POOL as u32).is_err());
    }

    #[test]
    fn data_connection_pool_default_size_fits_comfortably_under_the_cap() {
        assert!(DEFAULT_DATA_CONNECTION_POOL < MAX_DATA_CONNECTION_POOL);
    }

    #[test]
    fn decode_stream_frames_handles_multiple_frames_in_one_read() {
        let a = ChannelData::new(0x4001, Bytes::from_static(b"hi"));
        let b = ChannelData::new(0x4002, Bytes::from_static(b"there"));
        let mut buf = a.encode().to_vec();
        buf.extend_from_slice(&b.encode());
        let (frames, consumed) = decode_stream_frames(&buf).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(consumed, buf.len());
    }

    #[tokio::test]
    async fn connect_binds_a_local_socket_and_starts_the_allocation() {
        let server: SocketAddr = "127.0.0.1:34780".parse().unwrap();
        let (socket, mut events) = TurnSocket::connect(server, None).await.unwrap();
        assert_eq!(socket.state(), ComponentState::Running);
        assert!(!socket.is_closed());
        socket.stats().increment(METRIC_BYTES_SENT, 0.0); // stats handle is live and shared
        let _ = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
    }

    #[tokio::test]
    async fn lifecycle_methods_progress_through_the_expected_states() {
        let server: SocketAddr = "127.0.0.1:34781".parse().unwrap();
        let mut socket = TurnSocket::new(server, None);
        assert_eq!(socket.state(), ComponentState::Created);
        socket.init().await.unwrap();
        assert_eq!(socket.state(), ComponentState::Initialized);
        socket.start().await.unwrap();
        assert_eq!(socket.state(), ComponentState::Running);
        socket.stop().await.unwrap();
        assert_eq!(socket.state(), ComponentState::Stopped);
        socket.shutdown().await.unwrap();
        assert_eq!(socket.state(), ComponentState::ShutDown);
    }

    #[test]
    fn registry_tracks_registered_sockets() {
        let registry = TurnSocketRegistry::new();
        assert!(registry.is_empty());
        let addr: SocketAddr = "198.51.100.1:50000".parse().unwrap();
        let socket = Arc::new(TurnSocket::new("198.51.100.1:3478".parse().unwrap(), None));
        registry.register(addr, socket);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(addr).is_some());
        registry.remove(addr);
        assert!(registry.is_empty());
    }
}

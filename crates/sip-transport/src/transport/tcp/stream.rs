use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sip_core::parser::{message_length, FramingMode};
use sip_core::types::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportEvent, TransportKind};

const DEFAULT_CHANNEL_CAPACITY: usize = 100;
const READ_CHUNK: usize = 8192;
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// The §4.4 "initial activity" timeout: an accepted connection that
/// never completes one full message in this window is dropped.
const INITIAL_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

/// The §4.4 keep-alive cadence: a double-CRLF ping sent on idle
/// connections, per RFC 5626's transport keep-alive convention.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(90);

/// A connected TCP transport. Unlike UDP, there is one of these per
/// remote peer (§4.4's pool keys on `(type, remote_addr)`), and it owns
/// a reassembly buffer across reads since one read may contain a
/// partial, exact, or multiple SIP messages.
#[derive(Clone)]
pub struct TcpTransport {
    inner: Arc<TcpTransportInner>,
}

struct TcpTransportInner {
    write_half: Mutex<OwnedWriteHalf>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    closed: AtomicBool,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl TcpTransport {
    /// Actively connects to `addr` (the client side of §4.4's connect
    /// queuing; the deadline itself is enforced by the manager via
    /// Timer B, not here).
    pub async fn connect(addr: SocketAddr, channel_capacity: Option<usize>) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true).ok();
        Self::from_stream(stream, channel_capacity, false)
    }

    /// Wraps an already-accepted stream (the server side, from
    /// [`super::listener::TcpListener`]'s accept loop).
    pub fn from_accepted(stream: TcpStream, channel_capacity: Option<usize>) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        stream.set_nodelay(true).ok();
        Self::from_stream(stream, channel_capacity, true)
    }

    fn from_stream(stream: TcpStream, channel_capacity: Option<usize>, accepted: bool) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let local_addr = stream.local_addr()?;
        let remote_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();

        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let transport = TcpTransport {
            inner: Arc::new(TcpTransportInner {
                write_half: Mutex::new(write_half),
                local_addr,
                remote_addr,
                closed: AtomicBool::new(false),
                events_tx,
            }),
        };

        transport.spawn_receive_loop(read_half, accepted);
        Ok((transport, events_rx))
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_addr
    }

    fn spawn_receive_loop(&self, mut read_half: OwnedReadHalf, accepted: bool) {
        let transport = self.clone();
        tokio::spawn(async move {
            let inner = &transport.inner;
            let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
            let mut chunk = vec![0u8; READ_CHUNK];
            let mut saw_first_message = !accepted;

            loop {
                let read_result = if saw_first_message {
                    read_half.read(&mut chunk).await
                } else {
                    match tokio::time::timeout(INITIAL_ACTIVITY_TIMEOUT, read_half.read(&mut chunk)).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!("connection from {} dropped: no message within activity timeout", inner.remote_addr);
                            break;
                        }
                    }
                };

                let n = match read_result {
                    Ok(0) => {
                        debug!("connection to {} closed by peer", inner.remote_addr);
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        error!("error reading from {}: {}", inner.remote_addr, e);
                        let _ = inner.events_tx.send(TransportEvent::Error { error: e.to_string() }).await;
                        break;
                    }
                };

                buf.extend_from_slice(&chunk[..n]);

                loop {
                    match message_length(&buf, FramingMode::Stream) {
                        Ok(len) => {
                            if len > MAX_MESSAGE_SIZE {
                                warn!("message from {} exceeds max size, dropping connection", inner.remote_addr);
                                let _ = inner.events_tx.send(TransportEvent::Error { error: "message too large".into() }).await;
                                return;
                            }
                            let frame: Vec<u8> = buf.drain(..len).collect();
                            saw_first_message = true;
                            match sip_core::parser::parse_message(&frame) {
                                Ok(message) => {
                                    let event = TransportEvent::MessageReceived {
                                        message,
                                        source: inner.remote_addr,
                                        destination: inner.local_addr,
                                    };
                                    if inner.events_tx.send(event).await.is_err() {
                                        return;
                                    }
                                }
                                Err(e) => {
                                    warn!("error parsing message from {}: {}", inner.remote_addr, e);
                                    let _ = inner.events_tx.send(TransportEvent::Error { error: e.to_string() }).await;
                                }
                            }
                        }
                        Err(sip_core::error::Error::NeedMoreData) => break,
                        Err(e) => {
                            warn!("framing error from {}: {}, dropping connection", inner.remote_addr, e);
                            let _ = inner.events_tx.send(TransportEvent::Error { error: e.to_string() }).await;
                            return;
                        }
                    }

                    if buf.len() > MAX_MESSAGE_SIZE {
                        warn!("unbounded buffer from {}, dropping connection", inner.remote_addr);
                        return;
                    }
                }

                // Compact the buffer if it's grown large but mostly drained,
                // so a long-lived connection doesn't retain a huge allocation.
                if buf.is_empty() && buf.capacity() > READ_CHUNK * 4 {
                    buf.shrink_to(READ_CHUNK);
                }
            }

            inner.closed.store(true, Ordering::Relaxed);
            let _ = inner
                .events_tx
                .send(TransportEvent::Disconnected { remote: inner.remote_addr, reason: "stream closed".into() })
                .await;
            let _ = inner.events_tx.send(TransportEvent::Closed).await;
            info!("TCP receive loop for {} terminated", inner.remote_addr);
        });
    }

    /// Sends a bare CRLF keep-alive ping, per §4.4's idle-connection
    /// heartbeat. Callers (the manager) schedule this on
    /// [`KEEPALIVE_INTERVAL`].
    pub async fn send_keepalive(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }
        let mut write_half = self.inner.write_half.lock().await;
        write_half.write_all(b"\r\n").await?;
        write_half.flush().await?;
        Ok(())
    }

    pub fn keepalive_interval() -> Duration {
        KEEPALIVE_INTERVAL
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr)
    }

    async fn send_message(&self, message: Message, destination: SocketAddr) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }
        if destination != self.inner.remote_addr {
            return Err(Error::NotConnected(destination));
        }
        let bytes = message.to_bytes();
        debug!("sending {} bytes to {}", bytes.len(), destination);
        let mut write_half = self.inner.write_half.lock().await;
        write_half.write_all(&bytes).await?;
        write_half.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Relaxed);
        let mut write_half = self.inner.write_half.lock().await;
        let _ = write_half.shutdown().await;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TcpTransport({} -> {})", self.inner.local_addr, self.inner.remote_addr)
    }
}

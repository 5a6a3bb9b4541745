//! TLS transport: a TCP connection wrapped in a `rustls` session,
//! providing the secure variant of §4.4's reliable transports. Framing,
//! reassembly, and keep-alive follow the same rules as plain TCP; only
//! the byte channel underneath differs.
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sip_core::parser::{message_length, FramingMode};
use sip_core::types::Message;
use tokio::io::{split, AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_rustls::{TlsAcceptor, TlsConnector};
use tokio_rustls::rustls::{ClientConfig, ServerConfig, ServerName};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportEvent, TransportKind};

const DEFAULT_CHANNEL_CAPACITY: usize = 100;
const READ_CHUNK: usize = 8192;
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

type TlsStream = tokio_rustls::TlsStream<TcpStream>;

#[derive(Clone)]
pub struct TlsTransport {
    inner: Arc<TlsTransportInner>,
}

struct TlsTransportInner {
    write_half: Mutex<WriteHalf<TlsStream>>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    closed: AtomicBool,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl TlsTransport {
    /// Client-side connect: TCP dial followed by a TLS handshake against
    /// `server_name`.
    pub async fn connect(
        addr: SocketAddr,
        server_name: &str,
        config: Arc<ClientConfig>,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let tcp = TcpStream::connect(addr).await?;
        tcp.set_nodelay(true).ok();
        let local_addr = tcp.local_addr()?;
        let remote_addr = tcp.peer_addr()?;
        let connector = TlsConnector::from(config);
        let name = ServerName::try_from(server_name)
            .map_err(|e| Error::TlsHandshake(e.to_string()))?;
        let stream = connector
            .connect(name, tcp)
            .await
            .map_err(|e| Error::TlsHandshake(e.to_string()))?;
        Self::from_stream(tokio_rustls::TlsStream::Client(stream), local_addr, remote_addr, channel_capacity)
    }

    /// Server-side accept: wraps an already-accepted TCP stream with a
    /// TLS handshake using `config`.
    pub async fn from_accepted(
        stream: TcpStream,
        config: Arc<ServerConfig>,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        stream.set_nodelay(true).ok();
        let local_addr = stream.local_addr()?;
        let remote_addr = stream.peer_addr()?;
        let acceptor = TlsAcceptor::from(config);
        let stream = acceptor
            .accept(stream)
            .await
            .map_err(|e| Error::TlsHandshake(e.to_string()))?;
        Self::from_stream(tokio_rustls::TlsStream::Server(stream), local_addr, remote_addr, channel_capacity)
    }

    fn from_stream(
        stream: TlsStream,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let (read_half, write_half) = split(stream);

        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let transport = TlsTransport {
            inner: Arc::new(TlsTransportInner {
                write_half: Mutex::new(write_half),
                local_addr,
                remote_addr,
                closed: AtomicBool::new(false),
                events_tx,
            }),
        };

        transport.spawn_receive_loop(read_half);
        Ok((transport, events_rx))
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_addr
    }

    fn spawn_receive_loop(&self, mut read_half: ReadHalf<TlsStream>) {
        let transport = self.clone();
        tokio::spawn(async move {
            let inner = &transport.inner;
            let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
            let mut chunk = vec![0u8; READ_CHUNK];

            loop {
                let n = match read_half.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        error!("error reading TLS stream from {}: {}", inner.remote_addr, e);
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
                                return;
                            }
                            let frame: Vec<u8> = buf.drain(..len).collect();
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
                            warn!("framing error from {}: {}", inner.remote_addr, e);
                            let _ = inner.events_tx.send(TransportEvent::Error { error: e.to_string() }).await;
                            return;
                        }
                    }
                }
            }

            inner.closed.store(true, Ordering::Relaxed);
            let _ = inner
                .events_tx
                .send(TransportEvent::Disconnected { remote: inner.remote_addr, reason: "stream closed".into() })
                .await;
            let _ = inner.events_tx.send(TransportEvent::Closed).await;
            debug!("TLS receive loop for {} terminated", inner.remote_addr);
        });
    }
}

#[async_trait]
impl Transport for TlsTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tls
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

impl fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TlsTransport({} -> {})", self.inner.local_addr, self.inner.remote_addr)
    }
}

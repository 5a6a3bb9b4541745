mod listener;
mod sender;

pub use listener::UdpListener;
pub use sender::UdpSender;

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sip_core::types::Message;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportEvent, TransportKind};

const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// UDP transport for SIP messages: the one datagram transport in §4.4,
/// always reliable-unaware (no retransmission of its own — that's the
/// transaction layer's job).
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    sender: UdpSender,
    listener: Arc<UdpListener>,
    closed: AtomicBool,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr, channel_capacity: Option<usize>) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let listener = UdpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("SIP UDP transport bound to {}", local_addr);

        let sender = UdpSender::new(listener.clone_socket())?;

        let transport = UdpTransport {
            inner: Arc::new(UdpTransportInner {
                sender,
                listener: Arc::new(listener),
                closed: AtomicBool::new(false),
                events_tx,
            }),
        };

        transport.spawn_receive_loop();
        Ok((transport, events_rx))
    }

    #[cfg(test)]
    pub fn dummy() -> Self {
        let (events_tx, _) = mpsc::channel(1);
        UdpTransport {
            inner: Arc::new(UdpTransportInner {
                sender: UdpSender::default(),
                listener: Arc::new(UdpListener::default()),
                closed: AtomicBool::new(true),
                events_tx,
            }),
        }
    }

    fn spawn_receive_loop(&self) {
        let transport = self.clone();
        tokio::spawn(async move {
            let inner = &transport.inner;
            let listener = inner.listener.clone();

            while !inner.closed.load(Ordering::Relaxed) {
                match listener.receive().await {
                    Ok((packet, src, local_addr)) => {
                        debug!("received {} bytes from {}", packet.len(), src);
                        match sip_core::parser::parse_message(&packet) {
                            Ok(message) => {
                                let event = TransportEvent::MessageReceived { message, source: src, destination: local_addr };
                                if inner.events_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("error parsing SIP datagram from {}: {}", src, e);
                                let _ = inner.events_tx.send(TransportEvent::Error { error: e.to_string() }).await;
                            }
                        }
                    }
                    Err(e) => {
                        if inner.closed.load(Ordering::Relaxed) {
                            break;
                        }
                        error!("error receiving UDP packet: {}", e);
                        let _ = inner.events_tx.send(TransportEvent::Error { error: e.to_string() }).await;
                    }
                }
            }

            let _ = inner.events_tx.send(TransportEvent::Closed).await;
            info!("UDP receive loop terminated");
        });
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.listener.local_addr()
    }

    async fn send_message(&self, message: Message, destination: SocketAddr) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }
        let bytes = message.to_bytes();
        debug!("sending {} bytes to {}", bytes.len(), destination);
        self.inner.sender.send(&bytes, destination).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.listener.local_addr() {
            Ok(addr) => write!(f, "UdpTransport({})", addr),
            Err(_) => write!(f, "UdpTransport(<unbound>)"),
        }
    }
}

pub mod tcp;
#[cfg(feature = "tls")]
pub mod tls;
pub mod udp;

use std::net::SocketAddr;

use async_trait::async_trait;
use sip_core::types::Message;

use crate::error::Result;

/// The wire scheme a transport implements, used as half of the
/// transport pool's lookup key (§4.4 `key = (type, remote_addr)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Udp,
    Tcp,
    Tls,
}

impl TransportKind {
    pub fn is_datagram(&self) -> bool {
        matches!(self, TransportKind::Udp)
    }

    pub fn is_reliable(&self) -> bool {
        !matches!(self, TransportKind::Udp)
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, TransportKind::Tls)
    }
}

/// Events a transport emits to its owner (the transport manager):
/// inbound messages, unparseable datagrams/segments, and lifecycle
/// notices. §4.4's `{connected, disconnected}` state callbacks map to
/// `Connected`/`Disconnected` here.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    MessageReceived { message: Message, source: SocketAddr, destination: SocketAddr },
    Error { error: String },
    Connected { remote: SocketAddr },
    Disconnected { remote: SocketAddr, reason: String },
    Closed,
}

/// A transport: an opaque byte channel to a next hop (§4.4). Every
/// concrete transport (UDP/TCP/TLS) implements this so the manager can
/// treat them uniformly.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> TransportKind;

    fn local_addr(&self) -> Result<SocketAddr>;

    /// Sends a pre-parsed message to `destination`. Returns once the
    /// bytes are handed to the OS (datagram) or enqueued for a
    /// connected stream; queuing/backpressure is the transport's own
    /// concern, not the caller's.
    async fn send_message(&self, message: Message, destination: SocketAddr) -> Result<()>;

    /// Graceful shutdown: stop accepting new sends, let outstanding ones
    /// drain, then close. Concrete transports map this onto §4.4's
    /// `shutdown()`/`destroy()` split by doing the drain here and
    /// relying on `Drop`/group-lock release for the forced path.
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

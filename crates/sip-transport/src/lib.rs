//! Transport layer for SIP messages: UDP, TCP, and (optionally) TLS
//! byte-transports behind one [`transport::Transport`] trait, pooled and
//! dialed on demand by [`manager::TransportManager`].
pub mod error;
pub mod events;
pub mod factory;
pub mod manager;
pub mod transport;

pub use error::{Error, Result};
pub use transport::udp::UdpTransport;
pub use transport::tcp::TcpTransport;
#[cfg(feature = "tls")]
pub use transport::tls::TlsTransport;
pub use transport::{Transport, TransportEvent, TransportKind};

use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Binds a UDP transport to `addr`.
pub async fn bind_udp(addr: SocketAddr) -> Result<(UdpTransport, mpsc::Receiver<TransportEvent>)> {
    UdpTransport::bind(addr, None).await
}

/// Connects a TCP transport to `addr`.
pub async fn connect_tcp(addr: SocketAddr) -> Result<(TcpTransport, mpsc::Receiver<TransportEvent>)> {
    TcpTransport::connect(addr, None).await
}

pub mod prelude {
    pub use crate::{
        bind_udp, connect_tcp,
        events::TransportEventAdapter,
        factory::TransportFactory,
        manager::TransportManager,
        Error, Result, Transport, TransportEvent, TransportKind, UdpTransport, TcpTransport,
    };
    #[cfg(feature = "tls")]
    pub use crate::TlsTransport;
}

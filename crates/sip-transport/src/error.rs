use std::net::SocketAddr;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Transport-layer errors (§7's `transport` status, sub-kinds
/// `not_connected`/`closed`/`timeout`/`tls_handshake`/
/// `address_unreachable`).
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport is closed")]
    TransportClosed,

    #[error("not connected to {0}")]
    NotConnected(SocketAddr),

    #[error("connect to {addr} timed out")]
    ConnectTimeout { addr: SocketAddr },

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("address unreachable: {0}")]
    AddressUnreachable(SocketAddr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message parse error: {0}")]
    Parse(#[from] sip_core::error::Error),

    #[error("send queue full for {0}")]
    QueueFull(SocketAddr),

    #[error("unsupported transport: {0}")]
    Unsupported(String),
}

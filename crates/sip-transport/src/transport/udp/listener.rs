use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::error::Result;

/// Wraps the shared `tokio::net::UdpSocket` for both the receive loop
/// and the sender half ([`super::sender::UdpSender`]).
pub struct UdpListener {
    socket: Arc<UdpSocket>,
}

impl UdpListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(UdpListener { socket: Arc::new(socket) })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn clone_socket(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }

    /// Receives one datagram. On a datagram transport the whole packet
    /// is one message (§4.1 framing), so there is no boundary scan here.
    pub async fn receive(&self) -> Result<(Vec<u8>, SocketAddr, SocketAddr)> {
        let mut buf = vec![0u8; 65_535];
        let (len, src) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        let local = self.socket.local_addr()?;
        Ok((buf, src, local))
    }

    #[cfg(test)]
    pub fn default() -> Self {
        // A bound-but-unused placeholder socket for dummy transports in
        // tests that never actually send or receive.
        let std_socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind dummy udp socket");
        std_socket.set_nonblocking(true).expect("set nonblocking");
        let socket = UdpSocket::from_std(std_socket).expect("wrap dummy udp socket");
        UdpListener { socket: Arc::new(socket) }
    }
}

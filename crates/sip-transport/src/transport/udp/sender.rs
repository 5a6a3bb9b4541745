use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::error::Result;

/// The send half of a UDP transport, split out so the receive loop can
/// own the listener independently while sends come from any caller.
#[derive(Clone)]
pub struct UdpSender {
    socket: Arc<UdpSocket>,
}

impl UdpSender {
    pub fn new(socket: Arc<UdpSocket>) -> Result<Self> {
        Ok(UdpSender { socket })
    }

    pub async fn send(&self, bytes: &[u8], destination: SocketAddr) -> Result<()> {
        self.socket.send_to(bytes, destination).await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn default() -> Self {
        let std_socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind dummy udp socket");
        std_socket.set_nonblocking(true).expect("set nonblocking");
        let socket = UdpSocket::from_std(std_socket).expect("wrap dummy udp socket");
        UdpSender { socket: Arc::new(socket) }
    }
}

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener as TokioTcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::stream::TcpTransport;
use crate::error::Result;
use crate::transport::TransportEvent;

const DEFAULT_BACKLOG_CHANNEL_CAPACITY: usize = 64;

/// A TCP accept loop: listens on `addr` and, for every inbound
/// connection, wraps it in a [`TcpTransport`] and hands `(transport,
/// events_rx)` to whoever is driving the manager's registration.
pub struct TcpListener {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
}

/// One accepted connection, delivered alongside its own event stream so
/// the manager can register it the same way it would a locally
/// initiated [`TcpTransport::connect`].
pub struct AcceptedConnection {
    pub transport: TcpTransport,
    pub events: mpsc::Receiver<TransportEvent>,
}

impl TcpListener {
    pub async fn bind(addr: SocketAddr, per_connection_capacity: Option<usize>) -> Result<(Self, mpsc::Receiver<AcceptedConnection>)> {
        let listener = TokioTcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("SIP TCP listener bound to {}", local_addr);

        let closed = Arc::new(AtomicBool::new(false));
        let (accepted_tx, accepted_rx) = mpsc::channel(DEFAULT_BACKLOG_CHANNEL_CAPACITY);

        let loop_closed = closed.clone();
        tokio::spawn(async move {
            while !loop_closed.load(Ordering::Relaxed) {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        debug!("accepted TCP connection from {}", peer);
                        match TcpTransport::from_accepted(stream, per_connection_capacity) {
                            Ok((transport, events)) => {
                                if accepted_tx.send(AcceptedConnection { transport, events }).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => error!("failed to wrap accepted connection from {}: {}", peer, e),
                        }
                    }
                    Err(e) => {
                        if loop_closed.load(Ordering::Relaxed) {
                            break;
                        }
                        error!("error accepting TCP connection: {}", e);
                    }
                }
            }
            info!("TCP accept loop for {} terminated", local_addr);
        });

        Ok((TcpListener { local_addr, closed }, accepted_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

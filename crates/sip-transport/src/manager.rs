use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sip_core::types::Message;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::events::TransportEventAdapter;
use crate::factory::TransportFactory;
use crate::transport::{Transport, TransportEvent, TransportKind};

/// §4.4's connect-timeout deadline for a pending outbound connection
/// (Timer B, the same 64*T1 bound used for an INVITE client
/// transaction, applied here to "no transport yet" rather than "no
/// final response yet").
const CONNECT_TIMEOUT: Duration = Duration::from_secs(32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolKey {
    kind: TransportKind,
    remote: SocketAddr,
}

/// The transport pool: `key = (type, remote_addr) -> transport` (§4.4).
/// The pool lock is held only across map lookups/inserts, never across
/// the connect itself, so concurrent sends to different peers don't
/// serialize on each other; concurrent sends to the *same* not-yet-open
/// peer do serialize, which is the one case §4.4 asks for (no duplicate
/// handshakes to one remote).
pub struct TransportManager {
    factory: TransportFactory,
    pool: Mutex<HashMap<PoolKey, Arc<dyn Transport>>>,
    event_subscribers: mpsc::Sender<TransportEvent>,
}

impl TransportManager {
    pub fn new(factory: TransportFactory, event_capacity: usize) -> (Arc<Self>, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(event_capacity);
        let manager = Arc::new(TransportManager {
            factory,
            pool: Mutex::new(HashMap::new()),
            event_subscribers: tx,
        });
        (manager, rx)
    }

    /// Registers an already-bound/listening transport (e.g. the one
    /// local UDP socket, or a freshly accepted TCP/TLS connection) into
    /// the pool, and starts forwarding its events.
    pub async fn register(self: &Arc<Self>, transport: Arc<dyn Transport>, remote: SocketAddr, events: mpsc::Receiver<TransportEvent>) {
        let key = PoolKey { kind: transport.kind(), remote };
        self.pool.lock().await.insert(key, transport);
        self.spawn_event_forwarder(events);
    }

    fn spawn_event_forwarder(self: &Arc<Self>, mut events: mpsc::Receiver<TransportEvent>) {
        let out = self.event_subscribers.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if out.send(event).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Sends `message` to `destination` over a transport of `kind`,
    /// reusing a pooled connection or opening one, bounded by
    /// [`CONNECT_TIMEOUT`].
    pub async fn send(self: &Arc<Self>, kind: TransportKind, destination: SocketAddr, message: Message) -> Result<()> {
        let transport = self.get_or_connect(kind, destination).await?;
        let result = transport.send_message(message, destination).await;
        if matches!(result, Err(Error::TransportClosed) | Err(Error::Io(_))) {
            self.evict(kind, destination).await;
        }
        result
    }

    /// Returns a pooled (or freshly opened) transport to `remote` without
    /// sending anything, for callers that need to hold onto the
    /// transport handle themselves (e.g. a transaction's own
    /// retransmit timers calling `send_message` directly instead of
    /// going through [`Self::send`] each time).
    pub async fn transport_for(self: &Arc<Self>, kind: TransportKind, remote: SocketAddr) -> Result<Arc<dyn Transport>> {
        self.get_or_connect(kind, remote).await
    }

    async fn get_or_connect(self: &Arc<Self>, kind: TransportKind, remote: SocketAddr) -> Result<Arc<dyn Transport>> {
        let key = PoolKey { kind, remote };

        {
            let pool = self.pool.lock().await;
            if let Some(t) = pool.get(&key) {
                if !t.is_closed() {
                    return Ok(t.clone());
                }
            }
        }

        debug!("opening new {:?} transport to {}", kind, remote);
        let (transport, events) = tokio::time::timeout(CONNECT_TIMEOUT, self.factory.connect(kind, remote, None))
            .await
            .map_err(|_| Error::ConnectTimeout { addr: remote })??;
        let transport: Arc<dyn Transport> = Arc::from(transport);

        {
            let mut pool = self.pool.lock().await;
            pool.insert(key, transport.clone());
        }
        self.spawn_event_forwarder(events);

        Ok(transport)
    }

    /// Drops a pooled transport (e.g. after a fatal write error), so the
    /// next send opens a fresh connection instead of reusing a dead one.
    pub async fn evict(&self, kind: TransportKind, remote: SocketAddr) {
        self.pool.lock().await.remove(&PoolKey { kind, remote });
    }

    pub async fn shutdown(&self) {
        let mut pool = self.pool.lock().await;
        for (_, transport) in pool.drain() {
            if let Err(e) = transport.close().await {
                warn!("error closing transport during shutdown: {}", e);
            }
        }
    }
}

//! The transaction table (§7): matches inbound messages to the
//! transaction that owns them (RFC 3261 §17.2.3), creates new client and
//! server transactions, and surfaces whatever a transaction can't match
//! to anything up to the transaction user (TU) as a [`TransactionEvent`].
use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use sip_transport::{TransportEvent, TransportKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use sip_core::types::{Message, Method, Request, Response};

use crate::error::{Error, Result};
use crate::transaction::client::{InviteClientLogic, NonInviteClientLogic};
use crate::transaction::data::TransactionData;
use crate::transaction::runner::run_transaction_loop;
use crate::transaction::server::{InviteServerLogic, NonInviteServerLogic};
use crate::transaction::{InternalTransactionCommand, TransactionEvent, TransactionKey, TransactionKind, TransactionState};

/// How many commands a single transaction's own loop will buffer before
/// `send` backpressures the caller; transactions are low-traffic enough
/// that this almost never fills.
const TRANSACTION_COMMAND_CAPACITY: usize = 32;

pub struct TransactionManager {
    transport: Arc<sip_transport::TransportManager>,
    transactions: DashMap<TransactionKey, mpsc::Sender<InternalTransactionCommand>>,
    tu_tx: mpsc::Sender<TransactionEvent>,
}

impl TransactionManager {
    pub fn new(transport: Arc<sip_transport::TransportManager>, event_capacity: usize) -> (Arc<Self>, mpsc::Receiver<TransactionEvent>) {
        let (tu_tx, tu_rx) = mpsc::channel(event_capacity);
        let manager = Arc::new(TransactionManager { transport, transactions: DashMap::new(), tu_tx });
        (manager, tu_rx)
    }

    /// Drives the manager off a transport event stream (typically
    /// [`sip_transport::TransportManager`]'s own event receiver) until it
    /// closes. Intended to be `tokio::spawn`ed.
    pub async fn run(self: Arc<Self>, mut transport_events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = transport_events.recv().await {
            self.dispatch_transport_event(event).await;
        }
        debug!("transaction manager's transport event source closed");
    }

    async fn dispatch_transport_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::MessageReceived { message, source, .. } => self.route_message(message, source).await,
            TransportEvent::Error { error } => {
                let _ = self.tu_tx.send(TransactionEvent::Error { transaction_id: None, error }).await;
            }
            TransportEvent::Connected { .. } | TransportEvent::Disconnected { .. } | TransportEvent::Closed => {}
        }
    }

    async fn route_message(self: &Arc<Self>, message: Message, source: SocketAddr) {
        match &message {
            Message::Request(request) => self.route_request(request, message.clone(), source).await,
            Message::Response(response) => self.route_response(response, message.clone()).await,
        }
    }

    async fn route_request(self: &Arc<Self>, request: &Request, message: Message, source: SocketAddr) {
        let Some(branch) = request.top_via().and_then(|v| v.branch()).map(|b| b.to_string()) else {
            let _ = self
                .tu_tx
                .send(TransactionEvent::Error { transaction_id: None, error: "request has no top Via branch to match".to_string() })
                .await;
            return;
        };

        // RFC 3261 §17.2.3: CANCEL and a non-2xx ACK both match the
        // *original* INVITE server transaction by branch, not by their
        // own method.
        if matches!(request.method, Method::Ack | Method::Cancel) {
            let sibling = TransactionKey::new(branch.clone(), Method::Invite, true);
            if let Some(sender) = self.transactions.get(&sibling).map(|e| e.value().clone()) {
                if request.method == Method::Ack {
                    let _ = sender.send(InternalTransactionCommand::ProcessMessage(message)).await;
                    return;
                }
                // CANCEL is its own (non-INVITE) server transaction; the
                // TU still needs to see it to actually cancel the INVITE
                // side, so fall through to normal new-transaction
                // handling after confirming the sibling exists.
            } else if request.method == Method::Ack {
                // No matching server transaction: either a 2xx ACK
                // (which is a new dialog-layer request, not this FSM's
                // concern) or a stray retransmit after Timer I. Surface
                // it either way and let the TU decide.
                let key = TransactionKey::new(branch, Method::Ack, true);
                let _ = self.tu_tx.send(TransactionEvent::NewRequest { transaction_id: key, request: request.clone(), source }).await;
                return;
            }
        }

        let key = TransactionKey::new(branch, request.method.clone(), true);
        if let Some(sender) = self.transactions.get(&key).map(|e| e.value().clone()) {
            let _ = sender.send(InternalTransactionCommand::ProcessMessage(message)).await;
        } else {
            let _ = self.tu_tx.send(TransactionEvent::NewRequest { transaction_id: key, request: request.clone(), source }).await;
        }
    }

    async fn route_response(self: &Arc<Self>, response: &Response, message: Message) {
        let Some(branch) = response.top_via().and_then(|v| v.branch()).map(|b| b.to_string()) else {
            let _ = self
                .tu_tx
                .send(TransactionEvent::Error { transaction_id: None, error: "response has no top Via branch to match".to_string() })
                .await;
            return;
        };
        let method = response.cseq().map(|c| c.method.clone()).unwrap_or(Method::Invite);
        let key = TransactionKey::new(branch, method, false);

        match self.transactions.get(&key).map(|e| e.value().clone()) {
            Some(sender) => {
                let _ = sender.send(InternalTransactionCommand::ProcessMessage(message)).await;
            }
            None => {
                warn!(id = %key, "response matched no client transaction, dropping");
            }
        }
    }

    /// Starts a client transaction for `request`, sent to `destination`
    /// over a transport of `kind` (reused from the pool or freshly
    /// opened). `request` must already carry a Via with a branch (§8.1.1.7).
    pub async fn create_client_transaction(self: &Arc<Self>, request: Request, destination: SocketAddr, kind: TransportKind) -> Result<TransactionKey> {
        let branch = request.top_via().and_then(|v| v.branch()).ok_or_else(|| Error::Other("request missing Via branch".to_string()))?.to_string();
        let tx_kind = TransactionKind::for_request(&request.method, false);
        let key = TransactionKey::new(branch, request.method.clone(), false);

        if self.transactions.contains_key(&key) {
            return Err(Error::TransactionExists(key));
        }

        let transport = self.transport.transport_for(kind, destination).await?;
        let (self_tx, self_rx) = mpsc::channel(TRANSACTION_COMMAND_CAPACITY);
        let initial_state = if tx_kind.is_invite() { TransactionState::Calling } else { TransactionState::Trying };
        let data = Arc::new(TransactionData::new(key.clone(), initial_state, self.tu_tx.clone(), self_tx, transport, destination, request));

        self.transactions.insert(key.clone(), data.self_tx.clone());
        self.spawn_runner(tx_kind, data, self_rx, key.clone());
        Ok(key)
    }

    /// Starts a server transaction for an inbound `request` the caller
    /// already saw as a [`TransactionEvent::NewRequest`] and decided to
    /// accept. `source` is the request's origin, used as the transport
    /// destination for every response this transaction sends.
    pub async fn create_server_transaction(self: &Arc<Self>, request: Request, source: SocketAddr, transport: Arc<dyn sip_transport::Transport>) -> Result<TransactionKey> {
        let branch = request.top_via().and_then(|v| v.branch()).ok_or_else(|| Error::Other("request missing Via branch".to_string()))?.to_string();
        let tx_kind = TransactionKind::for_request(&request.method, true);
        let key = TransactionKey::new(branch, request.method.clone(), true);

        if self.transactions.contains_key(&key) {
            return Err(Error::TransactionExists(key));
        }

        let (self_tx, self_rx) = mpsc::channel(TRANSACTION_COMMAND_CAPACITY);
        let initial_state = if tx_kind.is_invite() { TransactionState::Proceeding } else { TransactionState::Trying };
        let data = Arc::new(TransactionData::new(key.clone(), initial_state, self.tu_tx.clone(), self_tx, transport, source, request));

        self.transactions.insert(key.clone(), data.self_tx.clone());
        self.spawn_runner(tx_kind, data, self_rx, key.clone());
        Ok(key)
    }

    fn spawn_runner(self: &Arc<Self>, kind: TransactionKind, data: Arc<TransactionData>, cmd_rx: mpsc::Receiver<InternalTransactionCommand>, key: TransactionKey) {
        let manager = self.clone();
        tokio::spawn(async move {
            match kind {
                TransactionKind::InviteClient => run_transaction_loop(data, Arc::new(InviteClientLogic), cmd_rx).await,
                TransactionKind::NonInviteClient => run_transaction_loop(data, Arc::new(NonInviteClientLogic), cmd_rx).await,
                TransactionKind::InviteServer => run_transaction_loop(data, Arc::new(InviteServerLogic), cmd_rx).await,
                TransactionKind::NonInviteServer => run_transaction_loop(data, Arc::new(NonInviteServerLogic), cmd_rx).await,
            }
            manager.transactions.remove(&key);
        });
    }

    /// Sends a message straight through the transport pool, bypassing the
    /// transaction table entirely. Callers today: the dialog layer's 2xx
    /// ACK (RFC 3261 §13.2.2.4, not its own transaction) and a glare
    /// rejection (a 500 answered before any server transaction exists
    /// for the re-INVITE it's refusing).
    pub async fn send_direct(&self, kind: TransportKind, destination: SocketAddr, message: impl Into<Message>) -> Result<()> {
        self.transport.send(kind, destination, message.into()).await.map_err(Error::from)
    }

    /// Hands a response to the server transaction named by `key` for it
    /// to send.
    pub async fn send_response(&self, key: &TransactionKey, response: Response) -> Result<()> {
        let sender = self.transactions.get(key).map(|e| e.value().clone()).ok_or_else(|| Error::TransactionNotFound(key.clone()))?;
        sender.send(InternalTransactionCommand::SendResponse(response)).await.map_err(|_| Error::ChannelClosed)
    }

    /// Forces a transaction to terminate immediately, bypassing its
    /// normal timer-driven wind-down (e.g. the TU abandoning a call).
    pub async fn terminate(&self, key: &TransactionKey) -> Result<()> {
        let sender = self.transactions.get(key).map(|e| e.value().clone()).ok_or_else(|| Error::TransactionNotFound(key.clone()))?;
        sender.send(InternalTransactionCommand::Terminate).await.map_err(|_| Error::ChannelClosed)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    #[cfg(test)]
    pub(crate) fn has_transaction(&self, key: &TransactionKey) -> bool {
        self.transactions.contains_key(key)
    }
}

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use sip_core::types::{Request, Response};

use crate::transaction::runner::{AsRefKey, AsRefState, HasCommandSender, HasTransactionEvents, HasTransport};
use crate::transaction::{AtomicTransactionState, InternalTransactionCommand, TransactionEvent, TransactionKey};

/// The data every transaction kind shares: identity, state, the
/// channels the generic runner needs, the transport it sends over, and
/// the request/response it's retransmitting. FSM-specific behavior
/// lives in the `TransactionLogic` impl, not here.
pub struct TransactionData {
    pub key: TransactionKey,
    pub state: Arc<AtomicTransactionState>,
    pub tu_tx: mpsc::Sender<TransactionEvent>,
    pub self_tx: mpsc::Sender<InternalTransactionCommand>,
    pub transport: Arc<dyn sip_transport::Transport>,
    pub remote_addr: SocketAddr,
    pub reliable_transport: bool,
    /// The request this transaction is for (client side: what it sent;
    /// server side: what it received), kept for retransmits and for
    /// building the eventual ACK.
    pub request: Mutex<Request>,
    /// The last final response sent/received, retransmitted by Timer G
    /// (server INVITE) or matched against by Timer K/D bookkeeping.
    pub last_response: Mutex<Option<Response>>,
}

impl TransactionData {
    pub fn new(
        key: TransactionKey,
        initial_state: crate::transaction::TransactionState,
        tu_tx: mpsc::Sender<TransactionEvent>,
        self_tx: mpsc::Sender<InternalTransactionCommand>,
        transport: Arc<dyn sip_transport::Transport>,
        remote_addr: SocketAddr,
        request: Request,
    ) -> Self {
        let reliable_transport = transport.kind().is_reliable();
        TransactionData {
            key,
            state: Arc::new(AtomicTransactionState::new(initial_state)),
            tu_tx,
            self_tx,
            transport,
            remote_addr,
            reliable_transport,
            request: Mutex::new(request),
            last_response: Mutex::new(None),
        }
    }
}

impl AsRefState for TransactionData {
    fn as_ref_state(&self) -> &Arc<AtomicTransactionState> {
        &self.state
    }
}

impl AsRefKey for TransactionData {
    fn as_ref_key(&self) -> &TransactionKey {
        &self.key
    }
}

impl HasTransactionEvents for TransactionData {
    fn get_tu_event_sender(&self) -> mpsc::Sender<TransactionEvent> {
        self.tu_tx.clone()
    }
}

impl HasTransport for TransactionData {
    fn get_transport_layer(&self) -> Arc<dyn sip_transport::Transport> {
        self.transport.clone()
    }
}

impl HasCommandSender for TransactionData {
    fn get_self_command_sender(&self) -> mpsc::Sender<InternalTransactionCommand> {
        self.self_tx.clone()
    }
}

use std::net::SocketAddr;

use sip_core::types::Request;
use transaction_core::TransactionKey;

use crate::dialog::{DialogId, DialogState};

/// Dialog-layer events the manager publishes for a TU (or session layer
/// above it) to subscribe to.
#[derive(Debug, Clone)]
pub enum DialogEvent {
    Created { dialog_id: DialogId },
    StateChanged { dialog_id: DialogId, old_state: DialogState, new_state: DialogState },
    Terminated { dialog_id: DialogId, reason: String },
    RecoveryStarted { dialog_id: DialogId, reason: String },
    RecoveryCompleted { dialog_id: DialogId },
    /// A request the manager couldn't resolve to an existing dialog by
    /// itself and a decision: a dialog-creating INVITE, an in-dialog
    /// request matched to `dialog_id` (BYE, re-INVITE, ...), or a
    /// request with no dialog at all (OPTIONS, REGISTER).
    IncomingRequest { transaction_id: TransactionKey, dialog_id: Option<DialogId>, request: Request, source: SocketAddr },
}

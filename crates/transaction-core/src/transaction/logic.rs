use async_trait::async_trait;
use tokio::sync::mpsc;

use sip_core::types::{Message, Response};

use crate::error::Result;
use crate::transaction::{InternalTransactionCommand, TransactionKind, TransactionState};

/// The FSM-specific half of a transaction: how it reacts to an incoming
/// message or a fired timer, and what it does on entering each state.
/// [`crate::transaction::runner::run_transaction_loop`] drives any `L:
/// TransactionLogic<D, TH>` through the shared event loop; this is where
/// the four RFC 3261 §17 diagrams actually differ from each other.
#[async_trait]
pub trait TransactionLogic<D, TH>: Send + Sync
where
    D: Send + Sync,
    TH: Send + Sync,
{
    fn kind(&self) -> TransactionKind;

    /// Reacts to a message (request retransmit, provisional/final
    /// response, ACK) arriving while in `current_state`. Returns the
    /// next state to transition to, if any.
    async fn process_message(&self, data: &D, message: Message, current_state: TransactionState, timer_handles: &mut TH) -> Result<Option<TransactionState>>;

    /// Reacts to a named timer firing while in `current_state`.
    async fn handle_timer(&self, data: &D, timer_name: &str, current_state: TransactionState, timer_handles: &mut TH) -> Result<Option<TransactionState>>;

    /// The TU hands a response to a server transaction to send. Client
    /// transactions never receive this; the default rejects it so a
    /// forgotten override fails loudly instead of silently dropping the
    /// response.
    async fn send_response(&self, _data: &D, _response: Response, _current_state: TransactionState, _timer_handles: &mut TH) -> Result<Option<TransactionState>> {
        Err(crate::error::Error::Other("this transaction kind does not accept TU-originated responses".to_string()))
    }

    /// Starts whatever timers/side effects belong to just having entered
    /// `new_state` (e.g. arming Timer A on entering Calling, sending the
    /// final response retransmit on entering Completed).
    async fn on_enter_state(
        &self,
        data: &D,
        new_state: TransactionState,
        previous_state: TransactionState,
        timer_handles: &mut TH,
        self_tx: mpsc::Sender<InternalTransactionCommand>,
    ) -> Result<()>;

    /// Cancels every timer this transaction kind might have armed.
    /// Called on every state transition (the old state's timers never
    /// outlive it) and on shutdown.
    fn cancel_all_specific_timers(&self, timer_handles: &mut TH);

    /// Cancels the INVITE server transaction's automatic "100 Trying
    /// after 200ms" timer, if one is armed. A no-op for every other
    /// transaction kind.
    async fn handle_cancel_timer_100(&self, _timer_handles: &mut TH) -> Result<()> {
        Ok(())
    }
}

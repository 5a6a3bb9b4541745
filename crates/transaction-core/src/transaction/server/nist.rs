//! The non-INVITE server transaction (RFC 3261 §17.2.2): Trying ->
//! Proceeding -> Completed -> Terminated. No auto-100, no ACK — Timer J
//! alone absorbs request retransmits after the final response is sent.
use async_trait::async_trait;
use tokio::sync::mpsc;

use sip_core::types::{Message, Response};

use crate::error::{Error, Result};
use crate::transaction::data::TransactionData;
use crate::transaction::timer_set::TimerSet;
use crate::transaction::{timers, InternalTransactionCommand, TransactionKind, TransactionState};

use super::super::logic::TransactionLogic;

#[derive(Default)]
pub struct NonInviteServerLogic;

#[async_trait]
impl TransactionLogic<TransactionData, TimerSet> for NonInviteServerLogic {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NonInviteServer
    }

    async fn process_message(&self, data: &TransactionData, message: Message, current_state: TransactionState, _timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        let request = match message.as_request() {
            Some(r) => r,
            None => return Ok(None),
        };
        if request.method != data.request.lock().method {
            return Ok(None);
        }

        match current_state {
            TransactionState::Trying => Ok(None),
            TransactionState::Proceeding | TransactionState::Completed => {
                if let Some(last) = data.last_response.lock().clone() {
                    data.transport.send_message(Message::Response(last), data.remote_addr).await?;
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn handle_timer(&self, _data: &TransactionData, timer_name: &str, current_state: TransactionState, _timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        match (timer_name, current_state) {
            ("J", TransactionState::Completed) => Ok(Some(TransactionState::Terminated)),
            _ => Ok(None),
        }
    }

    async fn send_response(&self, data: &TransactionData, response: Response, current_state: TransactionState, _timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        if !matches!(current_state, TransactionState::Trying | TransactionState::Proceeding) {
            return Err(Error::Other(format!("cannot send response from state {:?}", current_state)));
        }

        data.transport.send_message(Message::Response(response.clone()), data.remote_addr).await?;
        *data.last_response.lock() = Some(response.clone());

        if response.status.is_provisional() {
            Ok(Some(TransactionState::Proceeding))
        } else {
            Ok(Some(TransactionState::Completed))
        }
    }

    async fn on_enter_state(
        &self,
        data: &TransactionData,
        new_state: TransactionState,
        _previous_state: TransactionState,
        timer_handles: &mut TimerSet,
        self_tx: mpsc::Sender<InternalTransactionCommand>,
    ) -> Result<()> {
        if new_state == TransactionState::Completed {
            let delay = timers::timer_j(data.reliable_transport);
            if delay.is_zero() {
                let _ = self_tx.send(InternalTransactionCommand::TransitionTo(TransactionState::Terminated)).await;
            } else {
                timer_handles.arm("J", delay, self_tx);
            }
        }
        Ok(())
    }

    fn cancel_all_specific_timers(&self, timer_handles: &mut TimerSet) {
        timer_handles.cancel_all();
    }
}

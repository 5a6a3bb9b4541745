//! The non-INVITE client transaction (RFC 3261 §17.1.2): Trying ->
//! Proceeding -> Completed -> Terminated.
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use sip_core::types::{Message, StatusCode};

use crate::error::Result;
use crate::transaction::data::TransactionData;
use crate::transaction::timer_set::TimerSet;
use crate::transaction::{timers, InternalTransactionCommand, TransactionEvent, TransactionKind, TransactionState};

use super::super::logic::TransactionLogic;

#[derive(Default)]
pub struct NonInviteClientLogic;

#[async_trait]
impl TransactionLogic<TransactionData, TimerSet> for NonInviteClientLogic {
    fn kind(&self) -> TransactionKind {
        TransactionKind::NonInviteClient
    }

    async fn process_message(&self, data: &TransactionData, message: Message, current_state: TransactionState, _timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        let response = match message.as_response() {
            Some(r) => r,
            None => return Ok(None),
        };

        if response.status.is_provisional() {
            let _ = data
                .tu_tx
                .send(TransactionEvent::ProvisionalResponse { transaction_id: data.key.clone(), response: response.clone() })
                .await;
            return match current_state {
                TransactionState::Trying => Ok(Some(TransactionState::Proceeding)),
                _ => Ok(None),
            };
        }

        match current_state {
            TransactionState::Trying | TransactionState::Proceeding => {
                let event = if response.status.is_success() {
                    TransactionEvent::SuccessResponse { transaction_id: data.key.clone(), response: response.clone() }
                } else {
                    TransactionEvent::FailureResponse { transaction_id: data.key.clone(), response: response.clone() }
                };
                let _ = data.tu_tx.send(event).await;
                *data.last_response.lock() = Some(response.clone());
                Ok(Some(TransactionState::Completed))
            }
            _ => Ok(None),
        }
    }

    async fn handle_timer(&self, data: &TransactionData, timer_name: &str, current_state: TransactionState, timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        match (timer_name, current_state) {
            ("E", TransactionState::Trying) | ("E", TransactionState::Proceeding) => {
                let request = data.request.lock().clone();
                data.transport.send_message(Message::Request(request), data.remote_addr).await?;
                let previous = timer_handles.interval("E").unwrap_or_else(timers::timer_e_initial);
                let next = timers::timer_e_next(previous);
                timer_handles.arm("E", next, data.self_tx.clone());
                timer_handles.set_interval("E", next);
                Ok(None)
            }
            ("F", TransactionState::Trying) | ("F", TransactionState::Proceeding) => {
                debug!(id = %data.key, "Timer F fired, non-INVITE transaction timed out");
                let timeout = sip_core::types::Response::new(StatusCode::REQUEST_TIMEOUT);
                let _ = data.tu_tx.send(TransactionEvent::FailureResponse { transaction_id: data.key.clone(), response: timeout }).await;
                Ok(Some(TransactionState::Terminated))
            }
            ("K", TransactionState::Completed) => Ok(Some(TransactionState::Terminated)),
            _ => Ok(None),
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
        match new_state {
            TransactionState::Trying => {
                let request = data.request.lock().clone();
                data.transport.send_message(Message::Request(request), data.remote_addr).await?;
                if !data.reliable_transport {
                    timer_handles.arm("E", timers::timer_e_initial(), self_tx.clone());
                    timer_handles.set_interval("E", timers::timer_e_initial());
                }
                timer_handles.arm("F", timers::timer_f(), self_tx);
            }
            TransactionState::Completed => {
                let delay = timers::timer_k(data.reliable_transport);
                if delay.is_zero() {
                    let _ = self_tx.send(InternalTransactionCommand::TransitionTo(TransactionState::Terminated)).await;
                } else {
                    timer_handles.arm("K", delay, self_tx);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn cancel_all_specific_timers(&self, timer_handles: &mut TimerSet) {
        timer_handles.cancel_all();
    }
}

//! The INVITE client transaction (RFC 3261 §17.1.1): Calling ->
//! Proceeding -> Completed -> Terminated. A 2xx final response instead
//! terminates the transaction immediately — the TU owns the 2xx ACK and
//! its own retransmission/matching, not this FSM (§13.2.2.4).
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use sip_core::builder::ack_for_non_2xx;
use sip_core::types::{Message, StatusCode};

use crate::error::Result;
use crate::transaction::data::TransactionData;
use crate::transaction::timer_set::TimerSet;
use crate::transaction::{timers, InternalTransactionCommand, TransactionEvent, TransactionKind, TransactionState};

use super::super::logic::TransactionLogic;

#[derive(Default)]
pub struct InviteClientLogic;

#[async_trait]
impl TransactionLogic<TransactionData, TimerSet> for InviteClientLogic {
    fn kind(&self) -> TransactionKind {
        TransactionKind::InviteClient
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
                TransactionState::Calling => Ok(Some(TransactionState::Proceeding)),
                _ => Ok(None),
            };
        }

        if response.status.is_success() {
            let _ = data.tu_tx.send(TransactionEvent::SuccessResponse { transaction_id: data.key.clone(), response: response.clone() }).await;
            return match current_state {
                TransactionState::Calling | TransactionState::Proceeding => Ok(Some(TransactionState::Terminated)),
                _ => Ok(None),
            };
        }

        match current_state {
            TransactionState::Calling | TransactionState::Proceeding => {
                let _ = data.tu_tx.send(TransactionEvent::FailureResponse { transaction_id: data.key.clone(), response: response.clone() }).await;
                let invite = data.request.lock().clone();
                let ack = ack_for_non_2xx(&invite, response);
                data.transport.send_message(Message::Request(ack), data.remote_addr).await?;
                *data.last_response.lock() = Some(response.clone());
                Ok(Some(TransactionState::Completed))
            }
            TransactionState::Completed => {
                let invite = data.request.lock().clone();
                let ack = ack_for_non_2xx(&invite, response);
                data.transport.send_message(Message::Request(ack), data.remote_addr).await?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn handle_timer(&self, data: &TransactionData, timer_name: &str, current_state: TransactionState, timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        match (timer_name, current_state) {
            ("A", TransactionState::Calling) => {
                let invite = data.request.lock().clone();
                data.transport.send_message(Message::Request(invite), data.remote_addr).await?;
                let previous = timer_handles.interval("A").unwrap_or_else(timers::timer_a_initial);
                let next = timers::timer_a_next(previous);
                timer_handles.arm("A", next, data.self_tx.clone());
                timer_handles.set_interval("A", next);
                Ok(None)
            }
            ("B", TransactionState::Calling) => {
                debug!(id = %data.key, "Timer B fired, INVITE transaction timed out");
                let mut timeout = sip_core::types::Response::new(StatusCode::REQUEST_TIMEOUT);
                if let Some(request) = Some(data.request.lock().clone()) {
                    if let Some(call_id) = request.call_id() {
                        timeout.add_header(sip_core::types::headers::typed_header::TypedHeader::CallId(call_id.into()));
                    }
                }
                let _ = data.tu_tx.send(TransactionEvent::FailureResponse { transaction_id: data.key.clone(), response: timeout }).await;
                Ok(Some(TransactionState::Terminated))
            }
            ("D", TransactionState::Completed) => Ok(Some(TransactionState::Terminated)),
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
            TransactionState::Calling => {
                let invite = data.request.lock().clone();
                data.transport.send_message(Message::Request(invite), data.remote_addr).await?;
                if !data.reliable_transport {
                    timer_handles.arm("A", timers::timer_a_initial(), self_tx.clone());
                    timer_handles.set_interval("A", timers::timer_a_initial());
                }
                timer_handles.arm("B", timers::timer_b(), self_tx);
            }
            TransactionState::Completed => {
                timer_handles.arm("D", timers::timer_d(data.reliable_transport), self_tx);
            }
            _ => {}
        }
        Ok(())
    }

    fn cancel_all_specific_timers(&self, timer_handles: &mut TimerSet) {
        timer_handles.cancel_all();
    }
}

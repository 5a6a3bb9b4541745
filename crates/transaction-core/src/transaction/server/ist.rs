//! The INVITE server transaction (RFC 3261 §17.2.1): Proceeding ->
//! Completed -> Confirmed -> Terminated. A 2xx final response instead
//! jumps straight to Terminated — the TU/dialog layer owns retransmitting
//! 2xx responses and matching the separate 2xx ACK transaction, not this
//! FSM (§13.2.2.4).
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use sip_core::builder::ResponseBuilder;
use sip_core::types::{Message, Method, Response, StatusCode};

use crate::error::{Error, Result};
use crate::transaction::data::TransactionData;
use crate::transaction::timer_set::TimerSet;
use crate::transaction::{timers, InternalTransactionCommand, TransactionKind, TransactionState};

use super::super::logic::TransactionLogic;

/// How long an INVITE server transaction waits before auto-sending a 100
/// Trying if the TU hasn't sent one itself (§17.2.1).
const TIMER_100_TRYING_DELAY: std::time::Duration = std::time::Duration::from_millis(200);

#[derive(Default)]
pub struct InviteServerLogic;

#[async_trait]
impl TransactionLogic<TransactionData, TimerSet> for InviteServerLogic {
    fn kind(&self) -> TransactionKind {
        TransactionKind::InviteServer
    }

    async fn process_message(&self, data: &TransactionData, message: Message, current_state: TransactionState, timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        let request = match message.as_request() {
            Some(r) => r,
            None => return Ok(None),
        };

        match (current_state, request.method.clone()) {
            (TransactionState::Proceeding, Method::Invite) => {
                if let Some(last) = data.last_response.lock().clone() {
                    data.transport.send_message(Message::Response(last), data.remote_addr).await?;
                }
                Ok(None)
            }
            (TransactionState::Completed, Method::Invite) => {
                if let Some(last) = data.last_response.lock().clone() {
                    data.transport.send_message(Message::Response(last), data.remote_addr).await?;
                }
                Ok(None)
            }
            (TransactionState::Completed, Method::Ack) => Ok(Some(TransactionState::Confirmed)),
            _ => Ok(None),
        }
    }

    async fn handle_timer(&self, data: &TransactionData, timer_name: &str, current_state: TransactionState, timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        match (timer_name, current_state) {
            ("100", TransactionState::Proceeding) => {
                if data.last_response.lock().is_none() {
                    let request = data.request.lock().clone();
                    let trying = ResponseBuilder::for_request(StatusCode::TRYING, &request, None).build();
                    data.transport.send_message(Message::Response(trying.clone()), data.remote_addr).await?;
                    *data.last_response.lock() = Some(trying);
                }
                Ok(None)
            }
            ("G", TransactionState::Completed) => {
                if let Some(last) = data.last_response.lock().clone() {
                    data.transport.send_message(Message::Response(last), data.remote_addr).await?;
                }
                let previous = timer_handles.interval("G").unwrap_or_else(timers::timer_g_initial);
                let next = timers::timer_g_next(previous);
                timer_handles.arm("G", next, data.self_tx.clone());
                timer_handles.set_interval("G", next);
                Ok(None)
            }
            ("H", TransactionState::Completed) => {
                debug!(id = %data.key, "Timer H fired without ACK, terminating");
                Ok(Some(TransactionState::Terminated))
            }
            ("I", TransactionState::Confirmed) => Ok(Some(TransactionState::Terminated)),
            _ => Ok(None),
        }
    }

    async fn send_response(&self, data: &TransactionData, response: Response, current_state: TransactionState, timer_handles: &mut TimerSet) -> Result<Option<TransactionState>> {
        if current_state != TransactionState::Proceeding {
            return Err(Error::Other(format!("cannot send response from state {:?}", current_state)));
        }

        timer_handles.cancel("100");
        data.transport.send_message(Message::Response(response.clone()), data.remote_addr).await?;
        *data.last_response.lock() = Some(response.clone());

        if response.status.is_provisional() {
            Ok(None)
        } else if response.status.is_success() {
            Ok(Some(TransactionState::Terminated))
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
        match new_state {
            TransactionState::Proceeding => {
                timer_handles.arm("100", TIMER_100_TRYING_DELAY, self_tx);
            }
            TransactionState::Completed => {
                if !data.reliable_transport {
                    timer_handles.arm("G", timers::timer_g_initial(), self_tx.clone());
                    timer_handles.set_interval("G", timers::timer_g_initial());
                }
                timer_handles.arm("H", timers::timer_h(), self_tx);
            }
            TransactionState::Confirmed => {
                let delay = timers::timer_i(data.reliable_transport);
                if delay.is_zero() {
                    let _ = self_tx.send(InternalTransactionCommand::TransitionTo(TransactionState::Terminated)).await;
                } else {
                    timer_handles.arm("I", delay, self_tx);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn cancel_all_specific_timers(&self, timer_handles: &mut TimerSet) {
        timer_handles.cancel_all();
    }

    async fn handle_cancel_timer_100(&self, timer_handles: &mut TimerSet) -> Result<()> {
        timer_handles.cancel("100");
        Ok(())
    }
}

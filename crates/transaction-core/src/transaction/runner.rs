//! The generic event loop that drives any of the four RFC 3261 §17
//! transaction state machines: receive a command, ask the kind-specific
//! [`logic::TransactionLogic`] what to do with it, apply the resulting
//! state transition, and report significant events to the transaction
//! user (TU).
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::transaction::logic::TransactionLogic;
use crate::transaction::{AtomicTransactionState, InternalTransactionCommand, TransactionEvent, TransactionKey, TransactionState};

pub trait AsRefState {
    fn as_ref_state(&self) -> &Arc<AtomicTransactionState>;
}

pub trait AsRefKey {
    fn as_ref_key(&self) -> &TransactionKey;
}

pub trait HasTransactionEvents {
    fn get_tu_event_sender(&self) -> mpsc::Sender<TransactionEvent>;
}

pub trait HasTransport {
    fn get_transport_layer(&self) -> Arc<dyn sip_transport::Transport>;
}

pub trait HasCommandSender {
    fn get_self_command_sender(&self) -> mpsc::Sender<InternalTransactionCommand>;
}

/// Runs one transaction's event loop to completion (i.e. until it
/// reaches [`TransactionState::Terminated`] or its command channel
/// closes).
pub async fn run_transaction_loop<D, TH, L>(data: Arc<D>, logic: Arc<L>, mut cmd_rx: mpsc::Receiver<InternalTransactionCommand>)
where
    D: AsRefState + AsRefKey + HasTransactionEvents + HasTransport + HasCommandSender + Send + Sync + 'static,
    TH: Default + Send + Sync + 'static,
    L: TransactionLogic<D, TH> + Send + Sync + 'static,
{
    let mut timer_handles = TH::default();
    let tx_id = data.as_ref_key().clone();
    let initial_state = data.as_ref_state().get();

    debug!(id = %tx_id, state = ?initial_state, "transaction loop starting");

    // The FSM's first state never arrives via `TransitionTo` (nothing
    // transitions into it, it's just where `TransactionData` started) so
    // `on_enter_state` is primed here once, directly, for whatever side
    // effects entering it has (sending the initial request, arming its
    // timers).
    if let Err(e) = logic
        .on_enter_state(&data, initial_state, initial_state, &mut timer_handles, data.get_self_command_sender())
        .await
    {
        error!(id = %tx_id, %e, state = ?initial_state, "on_enter_state failed for initial state");
    }

    while let Some(command) = cmd_rx.recv().await {
        let current_state = data.as_ref_state().get();

        match command {
            InternalTransactionCommand::TransitionTo(requested_state) => {
                if current_state == requested_state {
                    trace!(id = %tx_id, state = ?current_state, "already in requested state");
                    continue;
                }

                if let Err(e) = AtomicTransactionState::validate_transition(logic.kind(), current_state, requested_state) {
                    error!(id = %tx_id, %e, "rejected invalid state transition");
                    let _ = data
                        .get_tu_event_sender()
                        .send(TransactionEvent::Error { transaction_id: Some(tx_id.clone()), error: e.to_string() })
                        .await;
                    continue;
                }

                logic.cancel_all_specific_timers(&mut timer_handles);
                let previous_state = data.as_ref_state().set(requested_state);
                debug!(id = %tx_id, ?previous_state, new_state = ?requested_state, "state transition");

                let notified = data
                    .get_tu_event_sender()
                    .send(TransactionEvent::StateChanged { transaction_id: tx_id.clone(), previous_state, new_state: requested_state })
                    .await;

                if notified.is_err() {
                    debug!(id = %tx_id, "TU event channel closed, terminating transaction");
                    logic.cancel_all_specific_timers(&mut timer_handles);
                    if requested_state != TransactionState::Terminated {
                        data.as_ref_state().set(TransactionState::Terminated);
                    }
                    break;
                }

                if let Err(e) = logic
                    .on_enter_state(&data, requested_state, previous_state, &mut timer_handles, data.get_self_command_sender())
                    .await
                {
                    error!(id = %tx_id, %e, new_state = ?requested_state, "on_enter_state failed");
                    if data
                        .get_tu_event_sender()
                        .send(TransactionEvent::Error { transaction_id: Some(tx_id.clone()), error: format!("entering {:?}: {}", requested_state, e) })
                        .await
                        .is_err()
                    {
                        logic.cancel_all_specific_timers(&mut timer_handles);
                        data.as_ref_state().set(TransactionState::Terminated);
                        break;
                    }
                }
            }
            InternalTransactionCommand::ProcessMessage(message) => {
                match logic.process_message(&data, message, current_state, &mut timer_handles).await {
                    Ok(Some(next_state)) => schedule_self_transition(&data, &tx_id, next_state).await,
                    Ok(None) => {}
                    Err(e) => {
                        if report_and_check_shutdown(&data, &tx_id, &e, &mut timer_handles, &*logic).await {
                            break;
                        }
                    }
                }
            }
            InternalTransactionCommand::Timer(timer_name) => {
                match logic.handle_timer(&data, &timer_name, current_state, &mut timer_handles).await {
                    Ok(Some(next_state)) => schedule_self_transition(&data, &tx_id, next_state).await,
                    Ok(None) => {}
                    Err(e) => {
                        if report_and_check_shutdown(&data, &tx_id, &e, &mut timer_handles, &*logic).await {
                            break;
                        }
                    }
                }
            }
            InternalTransactionCommand::SendResponse(response) => {
                match logic.send_response(&data, response, current_state, &mut timer_handles).await {
                    Ok(Some(next_state)) => schedule_self_transition(&data, &tx_id, next_state).await,
                    Ok(None) => {}
                    Err(e) => {
                        if report_and_check_shutdown(&data, &tx_id, &e, &mut timer_handles, &*logic).await {
                            break;
                        }
                    }
                }
            }
            InternalTransactionCommand::TransportError => {
                error!(id = %tx_id, "transport error, terminating transaction");
                let _ = data.get_tu_event_sender().send(TransactionEvent::TransportError { transaction_id: tx_id.clone() }).await;
                let _ = data.get_self_command_sender().send(InternalTransactionCommand::TransitionTo(TransactionState::Terminated)).await;
            }
            InternalTransactionCommand::Terminate => {
                debug!(id = %tx_id, "received Terminate");
                logic.cancel_all_specific_timers(&mut timer_handles);
                data.as_ref_state().set(TransactionState::Terminated);
                break;
            }
        }

        if data.as_ref_state().get() == TransactionState::Terminated {
            break;
        }
    }

    let final_state = data.as_ref_state().get();
    logic.cancel_all_specific_timers(&mut timer_handles);
    debug!(id = %tx_id, ?final_state, "transaction loop ended");

    if final_state == TransactionState::Terminated {
        let _ = data.get_tu_event_sender().send(TransactionEvent::TransactionTerminated { transaction_id: tx_id }).await;
    }
}

async fn schedule_self_transition<D: HasCommandSender>(data: &D, tx_id: &TransactionKey, next_state: TransactionState) {
    if let Err(e) = data.get_self_command_sender().send(InternalTransactionCommand::TransitionTo(next_state)).await {
        error!(id = %tx_id, %e, "failed to schedule self state transition");
    }
}

/// Reports a logic-layer error to the TU; if the TU is gone, the
/// transaction has no one left to report to and shuts itself down.
/// Returns whether the caller should break out of the event loop.
async fn report_and_check_shutdown<D, TH, L>(data: &D, tx_id: &TransactionKey, e: &crate::error::Error, timer_handles: &mut TH, logic: &L) -> bool
where
    D: AsRefState + HasTransactionEvents,
    L: TransactionLogic<D, TH> + ?Sized,
{
    error!(id = %tx_id, %e, "transaction logic error");
    let notified = data
        .get_tu_event_sender()
        .send(TransactionEvent::Error { transaction_id: Some(tx_id.clone()), error: e.to_string() })
        .await;
    if notified.is_err() {
        logic.cancel_all_specific_timers(timer_handles);
        data.as_ref_state().set(TransactionState::Terminated);
        true
    } else {
        false
    }
}

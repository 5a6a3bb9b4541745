//! Transaction state machines: the four RFC 3261 §17 FSMs (NICT, NIST,
//! ICT, IST) share one [`TransactionState`] enum, one atomic state cell,
//! and one generic event loop ([`runner`]); the FSM-specific transition
//! table and timer behavior live in [`logic::TransactionLogic`]
//! implementations under `client`/`server`.
pub mod client;
pub mod data;
pub mod key;
pub mod logic;
pub mod runner;
pub mod server;
pub mod timer_set;
pub mod timers;

use std::sync::atomic::{AtomicU8, Ordering};

use sip_core::types::Method;

pub use key::TransactionKey;

/// Which of the four RFC 3261 §17 FSMs a transaction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    InviteClient,
    NonInviteClient,
    InviteServer,
    NonInviteServer,
}

impl TransactionKind {
    pub fn for_request(method: &Method, is_server: bool) -> Self {
        match (method, is_server) {
            (Method::Invite, false) => TransactionKind::InviteClient,
            (Method::Invite, true) => TransactionKind::InviteServer,
            (_, false) => TransactionKind::NonInviteClient,
            (_, true) => TransactionKind::NonInviteServer,
        }
    }

    pub fn is_invite(&self) -> bool {
        matches!(self, TransactionKind::InviteClient | TransactionKind::InviteServer)
    }

    pub fn is_client(&self) -> bool {
        matches!(self, TransactionKind::InviteClient | TransactionKind::NonInviteClient)
    }
}

/// The union of all states any of the four FSMs can be in (§17.1.1,
/// §17.1.2, §17.2.1, §17.2.2). A given [`TransactionKind`] only ever
/// occupies a subset of these; [`AtomicTransactionState::validate_transition`]
/// enforces which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransactionState {
    Calling = 0,
    Trying = 1,
    Proceeding = 2,
    Completed = 3,
    Confirmed = 4,
    Terminated = 5,
}

impl TransactionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TransactionState::Calling,
            1 => TransactionState::Trying,
            2 => TransactionState::Proceeding,
            3 => TransactionState::Completed,
            4 => TransactionState::Confirmed,
            _ => TransactionState::Terminated,
        }
    }
}

/// The transaction's current state, stored as an atomic so the runner
/// (which owns the only mutation point) and read-only observers (tests,
/// diagnostics) can both access it without a lock.
pub struct AtomicTransactionState {
    inner: AtomicU8,
}

impl AtomicTransactionState {
    pub fn new(initial: TransactionState) -> Self {
        AtomicTransactionState { inner: AtomicU8::new(initial as u8) }
    }

    pub fn get(&self) -> TransactionState {
        TransactionState::from_u8(self.inner.load(Ordering::SeqCst))
    }

    /// Sets the state unconditionally and returns the previous one. The
    /// runner validates the transition with [`Self::validate_transition`]
    /// before calling this; this method itself does not.
    pub fn set(&self, new_state: TransactionState) -> TransactionState {
        let previous = self.inner.swap(new_state as u8, Ordering::SeqCst);
        TransactionState::from_u8(previous)
    }

    /// Checks a state transition against the RFC 3261 §17 table for
    /// `kind`. Terminated is always a valid destination from anywhere
    /// (transactions can always be aborted), everything else follows the
    /// per-FSM diagrams.
    pub fn validate_transition(kind: TransactionKind, from: TransactionState, to: TransactionState) -> Result<(), crate::error::Error> {
        use TransactionState::*;

        if to == Terminated {
            return Ok(());
        }

        let valid = match kind {
            TransactionKind::InviteClient => matches!(
                (from, to),
                (Calling, Proceeding) | (Calling, Completed) | (Proceeding, Completed) | (Completed, Completed)
            ),
            TransactionKind::NonInviteClient => matches!(
                (from, to),
                (Trying, Proceeding) | (Trying, Completed) | (Proceeding, Completed) | (Proceeding, Proceeding)
            ),
            TransactionKind::InviteServer => matches!(
                (from, to),
                (Proceeding, Proceeding) | (Proceeding, Completed) | (Completed, Confirmed)
            ),
            TransactionKind::NonInviteServer => matches!(
                (from, to),
                (Trying, Proceeding) | (Trying, Completed) | (Proceeding, Proceeding) | (Proceeding, Completed)
            ),
        };

        if valid {
            Ok(())
        } else {
            Err(crate::error::Error::InvalidTransition { kind, from, to })
        }
    }
}

/// Events the transaction layer reports upward to its user (the dialog
/// layer, or an application driving transactions directly).
#[derive(Debug, Clone)]
pub enum TransactionEvent {
    StateChanged { transaction_id: TransactionKey, previous_state: TransactionState, new_state: TransactionState },
    ProvisionalResponse { transaction_id: TransactionKey, response: sip_core::types::Response },
    SuccessResponse { transaction_id: TransactionKey, response: sip_core::types::Response },
    FailureResponse { transaction_id: TransactionKey, response: sip_core::types::Response },
    NewRequest { transaction_id: TransactionKey, request: sip_core::types::Request, source: std::net::SocketAddr },
    TransactionTerminated { transaction_id: TransactionKey },
    TransportError { transaction_id: TransactionKey },
    Error { transaction_id: Option<TransactionKey>, error: String },
}

/// Commands fed into a transaction's own event loop, either by its
/// manager/TU or by the transaction scheduling a follow-up command on
/// itself (e.g. a timer firing, or `process_message` requesting a state
/// change).
#[derive(Debug, Clone)]
pub enum InternalTransactionCommand {
    /// A message arrived from the network for this transaction.
    ProcessMessage(sip_core::types::Message),
    /// The TU wants to send a response out through this (server)
    /// transaction. Client transactions never receive this.
    SendResponse(sip_core::types::Response),
    TransitionTo(TransactionState),
    Timer(String),
    TransportError,
    Terminate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_client_calling_to_proceeding_is_valid() {
        assert!(AtomicTransactionState::validate_transition(
            TransactionKind::InviteClient,
            TransactionState::Calling,
            TransactionState::Proceeding
        )
        .is_ok());
    }

    #[test]
    fn invite_client_proceeding_to_calling_is_invalid() {
        assert!(AtomicTransactionState::validate_transition(
            TransactionKind::InviteClient,
            TransactionState::Proceeding,
            TransactionState::Calling
        )
        .is_err());
    }

    #[test]
    fn any_kind_can_always_terminate() {
        for kind in [
            TransactionKind::InviteClient,
            TransactionKind::NonInviteClient,
            TransactionKind::InviteServer,
            TransactionKind::NonInviteServer,
        ] {
            assert!(AtomicTransactionState::validate_transition(kind, TransactionState::Trying, TransactionState::Terminated).is_ok());
        }
    }

    #[test]
    fn atomic_state_set_returns_previous() {
        let state = AtomicTransactionState::new(TransactionState::Trying);
        let previous = state.set(TransactionState::Proceeding);
        assert_eq!(previous, TransactionState::Trying);
        assert_eq!(state.get(), TransactionState::Proceeding);
    }
}

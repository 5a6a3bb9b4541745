use thiserror::Error;

use crate::transaction::{TransactionKey, TransactionState};

pub type Result<T> = std::result::Result<T, Error>;

/// Transaction-layer errors (§7's `transaction` status).
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("invalid state transition for {kind:?} transaction: {from:?} -> {to:?}")]
    InvalidTransition { kind: crate::transaction::TransactionKind, from: TransactionState, to: TransactionState },

    #[error("no transaction found for key {0}")]
    TransactionNotFound(TransactionKey),

    #[error("a transaction already exists for key {0}")]
    TransactionExists(TransactionKey),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("message error: {0}")]
    Message(#[from] sip_core::error::Error),

    #[error("transaction command channel closed")]
    ChannelClosed,

    #[error("{0}")]
    Other(String),
}

impl From<sip_transport::Error> for Error {
    fn from(e: sip_transport::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

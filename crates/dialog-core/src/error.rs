use thiserror::Error;

use crate::dialog::DialogId;

pub type DialogResult<T> = std::result::Result<T, DialogError>;

/// Dialog-layer errors: malformed dialog-forming messages, sequence
/// number violations (RFC 3261 §12.2.2), and lookups against a dialog
/// table that no longer (or never did) hold the dialog in question.
#[derive(Error, Debug, Clone)]
pub enum DialogError {
    #[error("dialog protocol error: {0}")]
    ProtocolError(String),

    #[error("no dialog found for id {0}")]
    DialogNotFound(DialogId),

    #[error("a dialog already exists for call-id/tag triple ({0}, {1}, {2})")]
    DialogExists(String, String, String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

impl DialogError {
    pub fn protocol_error(message: impl Into<String>) -> Self {
        DialogError::ProtocolError(message.into())
    }
}

impl From<transaction_core::Error> for DialogError {
    fn from(e: transaction_core::Error) -> Self {
        DialogError::Transaction(e.to_string())
    }
}

impl From<sip_transport::Error> for DialogError {
    fn from(e: sip_transport::Error) -> Self {
        DialogError::Transport(e.to_string())
    }
}

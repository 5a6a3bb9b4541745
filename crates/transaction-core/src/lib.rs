//! The SIP transaction layer (RFC 3261 §17): the four client/server
//! transaction state machines, driven by one generic event loop
//! ([`transaction::runner`]), and the transaction table
//! ([`manager::TransactionManager`]) that matches inbound messages to
//! the transaction that owns them and creates new ones.
pub mod error;
pub mod manager;
pub mod transaction;

pub use error::{Error, Result};
pub use manager::TransactionManager;
pub use transaction::{TransactionEvent, TransactionKey, TransactionKind, TransactionState};

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::manager::TransactionManager;
    pub use crate::transaction::{InternalTransactionCommand, TransactionEvent, TransactionKey, TransactionKind, TransactionState};
}

//! A RFC 5389/5766/6062 TURN client: STUN and ChannelData codecs, the
//! allocation state machine with its permission and channel tables, and
//! the socket layer that drives an allocation over a real UDP transport
//! plus the peer-TCP data-connection pool.
pub mod allocation;
pub mod channel_data;
pub mod error;
pub mod integrity;
pub mod session;
pub mod socket;
pub mod stun;

pub use error::{Error, Result};
pub use session::{Credentials, SessionEvent, SessionState, TurnSession};
pub use socket::{TurnSocket, TurnSocketRegistry};

pub mod prelude {
    pub use crate::allocation::AllocationTables;
    pub use crate::channel_data::ChannelData;
    pub use crate::error::{Error, Result};
    pub use crate::session::{Credentials, SessionEvent, SessionState, TurnSession};
    pub use crate::socket::{TurnSocket, TurnSocketRegistry};
    pub use crate::stun::{Attribute, AttributeType, Message as StunMessage, Method as StunMethod};
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// TURN-layer errors, following the same `{syntax, transport, timeout,
/// protocol, auth, resource}` taxonomy the rest of this engine uses.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("malformed STUN message: {0}")]
    Syntax(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("resource exhausted: {0}")]
    Resource(String),

    #[error("operation cancelled")]
    Cancelled,
}

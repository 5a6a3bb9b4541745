use std::fmt;

/// The `Content-Length` header (RFC 3261 §20.14): the exact byte length of
/// the message body. Mandatory for a stream-framed message (§4.1); the
/// framer falls back to "rest of datagram" only when it's absent on a
/// datagram transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ContentLength(pub u32);

impl fmt::Display for ContentLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

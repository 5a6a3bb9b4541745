use std::fmt;

/// The `Min-Expires` header (RFC 3261 §20.23): carried on a 423 response
/// to tell the UAC the smallest `Expires` value the registrar accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MinExpires(pub u32);

impl fmt::Display for MinExpires {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

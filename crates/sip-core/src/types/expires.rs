use std::fmt;

/// The `Expires` header (RFC 3261 §20.19): a relative lifetime in seconds
/// for a registration or subscription. 0 means "expire immediately"
/// (used by REGISTER to remove a binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Expires(pub u32);

impl fmt::Display for Expires {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

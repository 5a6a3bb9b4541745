use std::fmt;

/// The `Call-ID` header (RFC 3261 §20.8): a globally unique identifier
/// shared by every message in a dialog (and by a standalone transaction
/// outside a dialog). Treated as an opaque token — nothing in the core
/// parses its internal structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CallId(pub String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        CallId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A random Call-ID suitable for a new dialog or standalone request:
    /// a hex-encoded random token followed by `@host`.
    pub fn generate(host: &str) -> Self {
        let mut bytes = [0u8; 16];
        for b in bytes.iter_mut() {
            *b = fastrand::u8(..);
        }
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        CallId(format!("{}@{}", hex, host))
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        CallId(s.to_string())
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        CallId(s)
    }
}

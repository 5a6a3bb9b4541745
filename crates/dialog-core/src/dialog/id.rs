use std::fmt;

use uuid::Uuid;

/// An opaque, process-local identifier for a [`super::Dialog`] (the
/// dialog table's primary key is the `(Call-ID, local tag, remote tag)`
/// triple per RFC 3261 §12.2; this is a cheaper handle to pass around
/// once a dialog has been looked up by that triple).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DialogId(Uuid);

impl DialogId {
    pub fn new() -> Self {
        DialogId(Uuid::new_v4())
    }
}

impl Default for DialogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

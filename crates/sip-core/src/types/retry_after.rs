use std::fmt;

use crate::types::param::ParamList;

/// The `Retry-After` header (RFC 3261 §20.33): a hint on a 503/480/486 for
/// how long the sender should wait before retrying.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetryAfter {
    pub seconds: u32,
    pub comment: Option<String>,
    pub params: ParamList,
}

impl RetryAfter {
    pub fn new(seconds: u32) -> Self {
        RetryAfter { seconds, comment: None, params: ParamList::new() }
    }

    /// The `duration` parameter: how long the condition causing the
    /// retry delay is expected to last.
    pub fn duration(&self) -> Option<u32> {
        self.params.get("duration").and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for RetryAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.seconds)?;
        if let Some(c) = &self.comment {
            write!(f, " ({})", c)?;
        }
        write!(f, "{}", self.params)
    }
}

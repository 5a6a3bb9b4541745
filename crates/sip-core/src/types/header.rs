use std::fmt;

use crate::types::headers::header_name::HeaderName;

/// A header the core has no typed model for, kept as a raw name/value
/// pair so the message can still carry it and re-print it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawHeader {
    pub name: HeaderName,
    pub value: String,
}

impl RawHeader {
    pub fn new(name: HeaderName, value: impl Into<String>) -> Self {
        RawHeader { name, value: value.into() }
    }
}

impl fmt::Display for RawHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

use std::fmt;

use crate::types::method::Method;

/// The `CSeq` header (RFC 3261 §20.16): a sequence number paired with the
/// method it was issued for. The method half is what lets a UA tell a
/// CANCEL's CSeq apart from the INVITE it cancels despite the shared
/// number space.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CSeq {
    pub seq: u32,
    pub method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Self {
        CSeq { seq, method }
    }

    pub fn next(&self) -> CSeq {
        CSeq { seq: self.seq.wrapping_add(1), method: self.method.clone() }
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

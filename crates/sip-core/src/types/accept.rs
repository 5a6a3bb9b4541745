use std::fmt;

use crate::types::param::ParamList;

/// One entry of an `Accept` header (RFC 3261 §20.1): a media range plus
/// parameters (most notably `q`, the relative preference weight).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AcceptEntry {
    pub media_type: String,
    pub media_subtype: String,
    pub params: ParamList,
}

impl AcceptEntry {
    pub fn q(&self) -> f32 {
        self.params.get("q").and_then(|v| v.parse().ok()).unwrap_or(1.0)
    }
}

impl fmt::Display for AcceptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.media_type, self.media_subtype, self.params)
    }
}

/// The `Accept` header: the list of media types the sender is willing to
/// receive in a response body.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Accept(pub Vec<AcceptEntry>);

impl fmt::Display for Accept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        f.write_str(&strs.join(", "))
    }
}

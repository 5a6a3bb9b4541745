use std::fmt;

use crate::types::param::ParamList;

/// The `Content-Type` header (RFC 3261 §20.15): a MIME media type paired
/// with optional parameters (most commonly `boundary` for multipart
/// bodies).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContentType {
    pub media_type: String,
    pub media_subtype: String,
    pub params: ParamList,
}

impl ContentType {
    pub fn new(media_type: impl Into<String>, media_subtype: impl Into<String>) -> Self {
        ContentType { media_type: media_type.into(), media_subtype: media_subtype.into(), params: ParamList::new() }
    }

    pub fn sdp() -> Self {
        ContentType::new("application", "sdp")
    }

    pub fn is_sdp(&self) -> bool {
        self.media_type.eq_ignore_ascii_case("application") && self.media_subtype.eq_ignore_ascii_case("sdp")
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.media_type, self.media_subtype, self.params)
    }
}

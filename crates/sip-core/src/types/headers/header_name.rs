use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The set of header names the core models natively, plus `Other` for
/// everything else.
///
/// Header names are case-insensitive in SIP and several have a one-letter
/// compact form (`Contact`/`m`, `From`/`f`, `To`/`t`, `Via`/`v`, `Call-ID`/
/// `i`, `Content-Length`/`l`, `Content-Type`/`c`, `Supported`/`k`). Parsing
/// normalizes either spelling to the same variant; printing always emits
/// the canonical long form — the compact forms exist for the wire, not for
/// our internal representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum HeaderName {
    From,
    To,
    Contact,
    CallId,
    CSeq,
    Via,
    Route,
    RecordRoute,
    MaxForwards,
    ContentLength,
    ContentType,
    Expires,
    MinExpires,
    Require,
    Supported,
    Unsupported,
    Allow,
    Accept,
    RetryAfter,
    Authorization,
    WwwAuthenticate,
    ProxyAuthenticate,
    ProxyAuthorization,
    /// A header name not in the fixed set above, kept verbatim (as seen on
    /// the wire) for round-tripping.
    Other(String),
}

impl HeaderName {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::From => "From",
            HeaderName::To => "To",
            HeaderName::Contact => "Contact",
            HeaderName::CallId => "Call-ID",
            HeaderName::CSeq => "CSeq",
            HeaderName::Via => "Via",
            HeaderName::Route => "Route",
            HeaderName::RecordRoute => "Record-Route",
            HeaderName::MaxForwards => "Max-Forwards",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::ContentType => "Content-Type",
            HeaderName::Expires => "Expires",
            HeaderName::MinExpires => "Min-Expires",
            HeaderName::Require => "Require",
            HeaderName::Supported => "Supported",
            HeaderName::Unsupported => "Unsupported",
            HeaderName::Allow => "Allow",
            HeaderName::Accept => "Accept",
            HeaderName::RetryAfter => "Retry-After",
            HeaderName::Authorization => "Authorization",
            HeaderName::WwwAuthenticate => "WWW-Authenticate",
            HeaderName::ProxyAuthenticate => "Proxy-Authenticate",
            HeaderName::ProxyAuthorization => "Proxy-Authorization",
            HeaderName::Other(s) => s.as_str(),
        }
    }

    /// The one-letter compact form for headers that have one (RFC 3261
    /// §7.3.3), or `None`.
    pub fn compact_form(&self) -> Option<&'static str> {
        match self {
            HeaderName::Contact => Some("m"),
            HeaderName::From => Some("f"),
            HeaderName::To => Some("t"),
            HeaderName::Via => Some("v"),
            HeaderName::CallId => Some("i"),
            HeaderName::ContentLength => Some("l"),
            HeaderName::ContentType => Some("c"),
            HeaderName::Supported => Some("k"),
            _ => None,
        }
    }

    /// Headers that may carry multiple comma-separated values on one line,
    /// which the parser splits into multiple `HeaderName`-tagged entries.
    pub fn is_list_valued(&self) -> bool {
        matches!(
            self,
            HeaderName::Via
                | HeaderName::Route
                | HeaderName::RecordRoute
                | HeaderName::Contact
                | HeaderName::Require
                | HeaderName::Supported
                | HeaderName::Unsupported
                | HeaderName::Allow
                | HeaderName::Accept
        )
    }

    /// Headers of which a request must carry exactly one instance; when
    /// the parser sees a second one it keeps it in the header list but
    /// accessors ignore it (§4.1 tie-breaks).
    pub fn is_single_valued(&self) -> bool {
        matches!(
            self,
            HeaderName::From
                | HeaderName::To
                | HeaderName::CallId
                | HeaderName::CSeq
                | HeaderName::MaxForwards
                | HeaderName::ContentLength
                | HeaderName::ContentType
        )
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeaderName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Ok(match lower.as_str() {
            "from" | "f" => HeaderName::From,
            "to" | "t" => HeaderName::To,
            "contact" | "m" => HeaderName::Contact,
            "call-id" | "i" => HeaderName::CallId,
            "cseq" => HeaderName::CSeq,
            "via" | "v" => HeaderName::Via,
            "route" => HeaderName::Route,
            "record-route" => HeaderName::RecordRoute,
            "max-forwards" => HeaderName::MaxForwards,
            "content-length" | "l" => HeaderName::ContentLength,
            "content-type" | "c" => HeaderName::ContentType,
            "expires" => HeaderName::Expires,
            "min-expires" => HeaderName::MinExpires,
            "require" => HeaderName::Require,
            "supported" | "k" => HeaderName::Supported,
            "unsupported" => HeaderName::Unsupported,
            "allow" => HeaderName::Allow,
            "accept" => HeaderName::Accept,
            "retry-after" => HeaderName::RetryAfter,
            "authorization" => HeaderName::Authorization,
            "www-authenticate" => HeaderName::WwwAuthenticate,
            "proxy-authenticate" => HeaderName::ProxyAuthenticate,
            "proxy-authorization" => HeaderName::ProxyAuthorization,
            _ => HeaderName::Other(s.to_string()),
        })
    }
}

use std::fmt;

use bytes::Bytes;

use crate::types::headers::header_name::HeaderName;
use crate::types::headers::typed_header::TypedHeader;
use crate::types::status::StatusCode;

/// A SIP response: status line, header list and body (RFC 3261 §7.2).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Response {
    pub status: StatusCode,
    pub reason: String,
    pub headers: Vec<TypedHeader>,
    #[serde(with = "crate::types::message::bytes_serde")]
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        let reason = status.default_reason().to_string();
        Response { status, reason, headers: Vec::new(), body: Bytes::new() }
    }

    pub fn with_reason(status: StatusCode, reason: impl Into<String>) -> Self {
        Response { status, reason: reason.into(), headers: Vec::new(), body: Bytes::new() }
    }

    pub fn header(&self, name: &HeaderName) -> Option<&TypedHeader> {
        self.headers.iter().find(|h| &h.name() == name)
    }

    pub fn headers_named<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a TypedHeader> + 'a {
        self.headers.iter().filter(move |h| &h.name() == name)
    }

    pub fn add_header(&mut self, header: TypedHeader) {
        self.headers.push(header);
    }

    pub fn remove_headers(&mut self, name: &HeaderName) {
        self.headers.retain(|h| &h.name() != name);
    }

    pub fn call_id(&self) -> Option<&str> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::CallId(c) => Some(c.as_str()),
            _ => None,
        })
    }

    pub fn cseq(&self) -> Option<&crate::types::cseq::CSeq> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::CSeq(c) => Some(c),
            _ => None,
        })
    }

    pub fn to_header(&self) -> Option<&crate::types::to::To> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::To(t) => Some(t),
            _ => None,
        })
    }

    pub fn from_header(&self) -> Option<&crate::types::from::From> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::From(f) => Some(f),
            _ => None,
        })
    }

    pub fn top_via(&self) -> Option<&crate::types::via::Via> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::Via(v) => Some(v),
            _ => None,
        })
    }

    pub fn content_length(&self) -> Option<u32> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::ContentLength(c) => Some(c.0),
            _ => None,
        })
    }

    /// The `WWW-Authenticate` challenge on a 401 (RFC 3261 §22.1).
    pub fn www_authenticate(&self) -> Option<&crate::types::auth::Challenge> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::WwwAuthenticate(c) => Some(c),
            _ => None,
        })
    }

    /// The `Proxy-Authenticate` challenge on a 407 (RFC 3261 §22.1).
    pub fn proxy_authenticate(&self) -> Option<&crate::types::auth::Challenge> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::ProxyAuthenticate(c) => Some(c),
            _ => None,
        })
    }

    /// Whether the transaction layer should treat this as a provisional
    /// (non-final) or final response (RFC 3261 §17).
    pub fn is_provisional(&self) -> bool {
        self.status.is_provisional()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SIP/2.0 {} {}\r", self.status, self.reason)?;
        for h in &self.headers {
            writeln!(f, "{}\r", h)?;
        }
        write!(f, "\r\n")?;
        if !self.body.is_empty() {
            f.write_str(&String::from_utf8_lossy(&self.body))?;
        }
        Ok(())
    }
}

use std::fmt;

use bytes::Bytes;

use crate::types::headers::header_name::HeaderName;
use crate::types::headers::typed_header::TypedHeader;
use crate::types::method::Method;
use crate::types::uri::Uri;

/// A SIP request: method, Request-URI, header list and body (RFC 3261
/// §7.1). The header list is ordered and may contain duplicates of a
/// list-valued header (Via, Route, ...); [`Request::header`] returns the
/// first match, [`Request::headers_named`] all of them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: Vec<TypedHeader>,
    #[serde(with = "crate::types::message::bytes_serde")]
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Request { method, uri, headers: Vec::new(), body: Bytes::new() }
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

    pub fn from_header(&self) -> Option<&crate::types::from::From> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::From(f) => Some(f),
            _ => None,
        })
    }

    pub fn to_header(&self) -> Option<&crate::types::to::To> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::To(t) => Some(t),
            _ => None,
        })
    }

    /// All `Via` headers, in wire order (closest-to-sender first).
    pub fn via_headers(&self) -> Vec<&crate::types::via::Via> {
        self.headers
            .iter()
            .filter_map(|h| match h {
                TypedHeader::Via(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn top_via(&self) -> Option<&crate::types::via::Via> {
        self.via_headers().into_iter().next()
    }

    pub fn max_forwards(&self) -> Option<crate::types::max_forwards::MaxForwards> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::MaxForwards(m) => Some(*m),
            _ => None,
        })
    }

    pub fn content_length(&self) -> Option<u32> {
        self.headers.iter().find_map(|h| match h {
            TypedHeader::ContentLength(c) => Some(c.0),
            _ => None,
        })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} SIP/2.0\r", self.method, self.uri)?;
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

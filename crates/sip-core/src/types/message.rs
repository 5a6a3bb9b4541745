use std::fmt;

use crate::error::{Error, Result};
use crate::types::request::Request;
use crate::types::response::Response;

/// A parsed SIP message: either a [`Request`] or a [`Response`].
///
/// Printing goes through [`Message::write_to`], which writes into a
/// caller-supplied fixed-size buffer and reports
/// [`Error::NotEnoughSpace`] rather than growing one, mirroring the
/// zero-copy, no-hidden-allocation printer contract the rest of the
/// engine relies on for datagram transports.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }

    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Message::Request(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Response(r) => Some(r),
            _ => None,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match self {
            Message::Request(r) => r.call_id(),
            Message::Response(r) => r.call_id(),
        }
    }

    pub fn cseq(&self) -> Option<&crate::types::cseq::CSeq> {
        match self {
            Message::Request(r) => r.cseq(),
            Message::Response(r) => r.cseq(),
        }
    }

    /// Writes the message's wire form into `buf`, returning the number
    /// of bytes written or [`Error::NotEnoughSpace`] if `buf` is too
    /// small to hold it.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<usize> {
        let rendered = self.to_string();
        let bytes = rendered.as_bytes();
        if bytes.len() > buf.len() {
            return Err(Error::NotEnoughSpace { needed: bytes.len(), available: buf.len() });
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Renders the message to an owned, growable buffer. Transports use
    /// this for datagram sends and for stream writes, where the fixed-
    /// buffer contract of [`Message::write_to`] is unnecessarily strict.
    pub fn to_bytes(&self) -> bytes::Bytes {
        bytes::Bytes::from(self.to_string().into_bytes())
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Request(r) => write!(f, "{}", r),
            Message::Response(r) => write!(f, "{}", r),
        }
    }
}

/// `serde` helper for `Bytes` fields: represented as a base64-free plain
/// byte vector, since message bodies are not assumed to be UTF-8.
pub(crate) mod bytes_serde {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, ser: S) -> Result<S::Ok, S::Error> {
        bytes.as_ref().serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Bytes, D::Error> {
        let v = Vec::<u8>::deserialize(de)?;
        Ok(Bytes::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::method::Method;
    use crate::types::uri::Uri;

    #[test]
    fn write_to_reports_not_enough_space() {
        let req = Request::new(Method::Invite, Uri::sip("example.com"));
        let msg = Message::Request(req);
        let mut buf = [0u8; 4];
        assert!(matches!(msg.write_to(&mut buf), Err(Error::NotEnoughSpace { .. })));
    }
}

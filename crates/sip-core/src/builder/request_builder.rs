use bytes::Bytes;

use crate::types::call_id::CallId;
use crate::types::contact::{Contact, ContactBinding};
use crate::types::content_length::ContentLength;
use crate::types::content_type::ContentType;
use crate::types::cseq::CSeq;
use crate::types::from::From as FromHeader;
use crate::types::headers::typed_header::TypedHeader;
use crate::types::max_forwards::MaxForwards;
use crate::types::method::Method;
use crate::types::request::Request;
use crate::types::to::To;
use crate::types::uri::Uri;
use crate::types::via::{Via, ViaTransport};

/// Builds a [`Request`] field by field, generating a branch ID and
/// filling in `Max-Forwards`/`Content-Length` defaults the way a UAC
/// normally would rather than leaving callers to remember them.
pub struct RequestBuilder {
    request: Request,
    content_length_set: bool,
}

impl RequestBuilder {
    pub fn new(method: Method, uri: Uri) -> Self {
        let mut request = Request::new(method, uri);
        request.add_header(TypedHeader::MaxForwards(MaxForwards::DEFAULT));
        RequestBuilder { request, content_length_set: false }
    }

    pub fn via(mut self, transport: ViaTransport, host: impl Into<String>) -> Self {
        let branch = crate::types::branch::generate_branch();
        self.request.add_header(TypedHeader::Via(Via::new(transport, host, branch)));
        self
    }

    pub fn from(mut self, uri: Uri, tag: impl Into<String>) -> Self {
        let mut from = FromHeader::new(uri);
        from.set_tag(tag);
        self.request.add_header(TypedHeader::From(from));
        self
    }

    pub fn to(mut self, uri: Uri) -> Self {
        self.request.add_header(TypedHeader::To(To::new(uri)));
        self
    }

    pub fn call_id(mut self, call_id: impl Into<CallId>) -> Self {
        self.request.add_header(TypedHeader::CallId(call_id.into()));
        self
    }

    pub fn cseq(mut self, seq: u32) -> Self {
        let method = self.request.method.clone();
        self.request.add_header(TypedHeader::CSeq(CSeq::new(seq, method)));
        self
    }

    pub fn contact(mut self, uri: Uri) -> Self {
        self.request.add_header(TypedHeader::Contact(Contact::Bindings(vec![ContactBinding::new(uri)])));
        self
    }

    pub fn max_forwards(mut self, value: u8) -> Self {
        self.request.remove_headers(&crate::types::headers::HeaderName::MaxForwards);
        self.request.add_header(TypedHeader::MaxForwards(MaxForwards(value)));
        self
    }

    pub fn header(mut self, header: TypedHeader) -> Self {
        self.request.add_header(header);
        self
    }

    pub fn body(mut self, content_type: ContentType, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.request.add_header(TypedHeader::ContentType(content_type));
        self.request.add_header(TypedHeader::ContentLength(ContentLength(body.len() as u32)));
        self.request.body = body;
        self.content_length_set = true;
        self
    }

    pub fn build(mut self) -> Request {
        if !self.content_length_set {
            self.request.add_header(TypedHeader::ContentLength(ContentLength(0)));
        }
        self.request
    }
}

use bytes::Bytes;

use crate::types::content_length::ContentLength;
use crate::types::content_type::ContentType;
use crate::types::headers::typed_header::TypedHeader;
use crate::types::request::Request;
use crate::types::response::Response;
use crate::types::status::StatusCode;
use crate::types::to::To;

/// Builds a [`Response`], optionally seeded from the [`Request`] it
/// answers so Via/From/Call-ID/CSeq/To copy across the way RFC 3261
/// §8.2.6 requires rather than needing to be re-specified by hand.
pub struct ResponseBuilder {
    response: Response,
    content_length_set: bool,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        ResponseBuilder { response: Response::new(status), content_length_set: false }
    }

    /// Seeds Via (all hops, unmodified), From, Call-ID and CSeq from the
    /// request being answered, and inserts a To with a generated tag if
    /// the request's own To lacked one and `status` is not provisional
    /// (provisional responses to a dialog-creating request normally
    /// still get a tag once the UAS has committed, per §12.1.1).
    pub fn for_request(status: StatusCode, request: &Request, to_tag: Option<String>) -> Self {
        let mut response = Response::new(status);
        for via in request.via_headers() {
            response.add_header(TypedHeader::Via(via.clone()));
        }
        if let Some(from) = request.from_header() {
            response.add_header(TypedHeader::From(from.clone()));
        }
        if let Some(call_id) = request.call_id() {
            response.add_header(TypedHeader::CallId(call_id.into()));
        }
        if let Some(cseq) = request.cseq() {
            response.add_header(TypedHeader::CSeq(cseq.clone()));
        }
        let mut to = request.to_header().cloned().unwrap_or_else(|| To::new(request.uri.clone()));
        if let Some(tag) = to_tag {
            if to.tag().is_none() {
                to.set_tag(tag);
            }
        }
        response.add_header(TypedHeader::To(to));
        ResponseBuilder { response, content_length_set: false }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.response.reason = reason.into();
        self
    }

    pub fn header(mut self, header: TypedHeader) -> Self {
        self.response.add_header(header);
        self
    }

    pub fn body(mut self, content_type: ContentType, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.response.add_header(TypedHeader::ContentType(content_type));
        self.response.add_header(TypedHeader::ContentLength(ContentLength(body.len() as u32)));
        self.response.body = body;
        self.content_length_set = true;
        self
    }

    pub fn build(mut self) -> Response {
        if !self.content_length_set {
            self.response.add_header(TypedHeader::ContentLength(ContentLength(0)));
        }
        self.response
    }
}

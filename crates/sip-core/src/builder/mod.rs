//! Fluent builders for [`crate::types::request::Request`] and
//! [`crate::types::response::Response`], plus ACK and CANCEL synthesis.
pub mod request_builder;
pub mod response_builder;

pub use request_builder::RequestBuilder;
pub use response_builder::ResponseBuilder;

use crate::types::headers::typed_header::TypedHeader;
use crate::types::headers::HeaderName;
use crate::types::method::Method;
use crate::types::request::Request;
use crate::types::response::Response;
use crate::types::route::RouteEntry;

/// Builds the ACK for a non-2xx final response to an INVITE (RFC 3261
/// §17.1.1.3): same branch, same Call-ID/From/CSeq-number, To taken from
/// the response (it carries the tag the far end generated). This ACK is
/// sent by the INVITE client transaction itself, not by the TU — it is
/// not a new transaction.
///
/// Building the ACK for a 2xx response is a TU responsibility instead
/// (RFC 3261 §13.2.2.4: it runs as its own transaction and may need a
/// freshly computed Request-URI from a Contact/route-set), so it is not
/// modeled here; dialog-core synthesizes it from dialog state.
pub fn ack_for_non_2xx(invite: &Request, response: &Response) -> Request {
    let mut ack = Request::new(Method::Ack, invite.uri.clone());
    if let Some(via) = invite.top_via() {
        ack.add_header(TypedHeader::Via(via.clone()));
    }
    if let Some(from) = invite.from_header() {
        ack.add_header(TypedHeader::From(from.clone()));
    }
    if let Some(to) = response.to_header() {
        ack.add_header(TypedHeader::To(to.clone()));
    } else if let Some(to) = invite.to_header() {
        ack.add_header(TypedHeader::To(to.clone()));
    }
    if let Some(call_id) = invite.call_id() {
        ack.add_header(TypedHeader::CallId(call_id.into()));
    }
    if let Some(cseq) = invite.cseq() {
        ack.add_header(TypedHeader::CSeq(crate::types::cseq::CSeq::new(cseq.seq, Method::Ack)));
    }
    for route in invite.headers_named(&HeaderName::Route) {
        ack.add_header(route.clone());
    }
    ack.add_header(TypedHeader::MaxForwards(crate::types::max_forwards::MaxForwards::DEFAULT));
    ack.add_header(TypedHeader::ContentLength(crate::types::content_length::ContentLength(0)));
    ack
}

/// Builds the ACK for a 2xx response once dialog-core has resolved the
/// target (the dialog's remote target) and the current route-set; split
/// out from [`ack_for_non_2xx`] because the two cases need different
/// inputs, not because the shape of the resulting message differs much.
pub fn ack_for_2xx(invite: &Request, response: &Response, target_uri: crate::types::uri::Uri, route_set: &[RouteEntry]) -> Request {
    let mut ack = Request::new(Method::Ack, target_uri);
    let branch = crate::types::branch::generate_branch();
    if let Some(via) = invite.top_via() {
        ack.add_header(TypedHeader::Via(crate::types::via::Via::new(via.transport, via.host.clone(), branch)));
    }
    if let Some(from) = invite.from_header() {
        ack.add_header(TypedHeader::From(from.clone()));
    }
    if let Some(to) = response.to_header() {
        ack.add_header(TypedHeader::To(to.clone()));
    }
    if let Some(call_id) = invite.call_id() {
        ack.add_header(TypedHeader::CallId(call_id.into()));
    }
    if let Some(cseq) = invite.cseq() {
        ack.add_header(TypedHeader::CSeq(crate::types::cseq::CSeq::new(cseq.seq, Method::Ack)));
    }
    if !route_set.is_empty() {
        ack.add_header(TypedHeader::Route(crate::types::route::Route(route_set.to_vec())));
    }
    ack.add_header(TypedHeader::MaxForwards(crate::types::max_forwards::MaxForwards::DEFAULT));
    ack.add_header(TypedHeader::ContentLength(crate::types::content_length::ContentLength(0)));
    ack
}

/// Builds the CANCEL for an in-flight INVITE (RFC 3261 §9.1): same
/// Request-URI, same top Via (the branch must match the INVITE being
/// cancelled), same Call-ID/From/To/Route, and the INVITE's CSeq number
/// with method CANCEL instead. Sent as its own non-INVITE transaction,
/// not through the INVITE transaction it cancels.
pub fn cancel_for(invite: &Request) -> Request {
    let mut cancel = Request::new(Method::Cancel, invite.uri.clone());
    if let Some(via) = invite.top_via() {
        cancel.add_header(TypedHeader::Via(via.clone()));
    }
    if let Some(from) = invite.from_header() {
        cancel.add_header(TypedHeader::From(from.clone()));
    }
    if let Some(to) = invite.to_header() {
        cancel.add_header(TypedHeader::To(to.clone()));
    }
    if let Some(call_id) = invite.call_id() {
        cancel.add_header(TypedHeader::CallId(call_id.into()));
    }
    if let Some(cseq) = invite.cseq() {
        cancel.add_header(TypedHeader::CSeq(crate::types::cseq::CSeq::new(cseq.seq, Method::Cancel)));
    }
    for route in invite.headers_named(&HeaderName::Route) {
        cancel.add_header(route.clone());
    }
    cancel.add_header(TypedHeader::MaxForwards(crate::types::max_forwards::MaxForwards::DEFAULT));
    cancel.add_header(TypedHeader::ContentLength(crate::types::content_length::ContentLength(0)));
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::method::Method as M;
    use crate::types::status::StatusCode;
    use crate::types::uri::Uri;

    #[test]
    fn ack_for_non_2xx_reuses_invite_branch_and_adopts_response_to_tag() {
        let invite = RequestBuilder::new(M::Invite, Uri::sip("bob@example.com"))
            .via(crate::types::via::ViaTransport::Udp, "pc33.example.com")
            .from(Uri::sip("alice@example.com"), "1928301774")
            .to(Uri::sip("bob@example.com"))
            .call_id("a84b4c76e66710@pc33.example.com")
            .cseq(314159)
            .build();

        let response = ResponseBuilder::for_request(StatusCode::BAD_REQUEST, &invite, Some("as83kd9".to_string())).build();

        let ack = ack_for_non_2xx(&invite, &response);
        assert_eq!(ack.method, M::Ack);
        assert_eq!(ack.top_via().unwrap().branch(), invite.top_via().unwrap().branch());
        assert_eq!(ack.cseq().unwrap().method, M::Ack);
        assert_eq!(ack.cseq().unwrap().seq, 314159);
    }

    #[test]
    fn cancel_for_reuses_the_invite_branch_and_cseq_number() {
        let invite = RequestBuilder::new(M::Invite, Uri::sip("bob@example.com"))
            .via(crate::types::via::ViaTransport::Udp, "pc33.example.com")
            .from(Uri::sip("alice@example.com"), "1928301774")
            .to(Uri::sip("bob@example.com"))
            .call_id("a84b4c76e66710@pc33.example.com")
            .cseq(314159)
            .build();

        let cancel = cancel_for(&invite);
        assert_eq!(cancel.method, M::Cancel);
        assert_eq!(cancel.top_via().unwrap().branch(), invite.top_via().unwrap().branch());
        assert_eq!(cancel.cseq().unwrap().method, M::Cancel);
        assert_eq!(cancel.cseq().unwrap().seq, 314159);
    }
}

use std::fmt;

use crate::types::accept::Accept;
use crate::types::allow::Allow;
use crate::types::auth::{Challenge, Credentials};
use crate::types::call_id::CallId;
use crate::types::contact::Contact;
use crate::types::content_length::ContentLength;
use crate::types::content_type::ContentType;
use crate::types::cseq::CSeq;
use crate::types::expires::Expires;
use crate::types::from::From as FromHeader;
use crate::types::header::RawHeader;
use crate::types::headers::header_name::HeaderName;
use crate::types::max_forwards::MaxForwards;
use crate::types::min_expires::MinExpires;
use crate::types::require::Require;
use crate::types::retry_after::RetryAfter;
use crate::types::route::{RecordRoute, Route};
use crate::types::supported::Supported;
use crate::types::to::To;
use crate::types::unsupported::Unsupported;
use crate::types::via::Via;

/// A single header on a message, either one of the natively-modeled
/// types below or a [`RawHeader`] fallback for everything else.
///
/// This is the central dispatch point the parser and printer both go
/// through: the parser decides which variant to build from the header
/// name, the printer asks each variant for its `HeaderName` and
/// delegates formatting to the inner type's `Display` impl.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TypedHeader {
    From(FromHeader),
    To(To),
    Contact(Contact),
    CallId(CallId),
    CSeq(CSeq),
    Via(Via),
    Route(Route),
    RecordRoute(RecordRoute),
    MaxForwards(MaxForwards),
    ContentLength(ContentLength),
    ContentType(ContentType),
    Expires(Expires),
    MinExpires(MinExpires),
    Require(Require),
    Supported(Supported),
    Unsupported(Unsupported),
    Allow(Allow),
    Accept(Accept),
    RetryAfter(RetryAfter),
    WwwAuthenticate(Challenge),
    ProxyAuthenticate(Challenge),
    Authorization(Credentials),
    ProxyAuthorization(Credentials),
    Raw(RawHeader),
}

impl TypedHeader {
    pub fn name(&self) -> HeaderName {
        match self {
            TypedHeader::From(_) => HeaderName::From,
            TypedHeader::To(_) => HeaderName::To,
            TypedHeader::Contact(_) => HeaderName::Contact,
            TypedHeader::CallId(_) => HeaderName::CallId,
            TypedHeader::CSeq(_) => HeaderName::CSeq,
            TypedHeader::Via(_) => HeaderName::Via,
            TypedHeader::Route(_) => HeaderName::Route,
            TypedHeader::RecordRoute(_) => HeaderName::RecordRoute,
            TypedHeader::MaxForwards(_) => HeaderName::MaxForwards,
            TypedHeader::ContentLength(_) => HeaderName::ContentLength,
            TypedHeader::ContentType(_) => HeaderName::ContentType,
            TypedHeader::Expires(_) => HeaderName::Expires,
            TypedHeader::MinExpires(_) => HeaderName::MinExpires,
            TypedHeader::Require(_) => HeaderName::Require,
            TypedHeader::Supported(_) => HeaderName::Supported,
            TypedHeader::Unsupported(_) => HeaderName::Unsupported,
            TypedHeader::Allow(_) => HeaderName::Allow,
            TypedHeader::Accept(_) => HeaderName::Accept,
            TypedHeader::RetryAfter(_) => HeaderName::RetryAfter,
            TypedHeader::WwwAuthenticate(_) => HeaderName::WwwAuthenticate,
            TypedHeader::ProxyAuthenticate(_) => HeaderName::ProxyAuthenticate,
            TypedHeader::Authorization(_) => HeaderName::Authorization,
            TypedHeader::ProxyAuthorization(_) => HeaderName::ProxyAuthorization,
            TypedHeader::Raw(r) => r.name.clone(),
        }
    }

    pub fn value_string(&self) -> String {
        match self {
            TypedHeader::From(h) => h.to_string(),
            TypedHeader::To(h) => h.to_string(),
            TypedHeader::Contact(h) => h.to_string(),
            TypedHeader::CallId(h) => h.to_string(),
            TypedHeader::CSeq(h) => h.to_string(),
            TypedHeader::Via(h) => h.to_string(),
            TypedHeader::Route(h) => h.to_string(),
            TypedHeader::RecordRoute(h) => h.to_string(),
            TypedHeader::MaxForwards(h) => h.to_string(),
            TypedHeader::ContentLength(h) => h.to_string(),
            TypedHeader::ContentType(h) => h.to_string(),
            TypedHeader::Expires(h) => h.to_string(),
            TypedHeader::MinExpires(h) => h.to_string(),
            TypedHeader::Require(h) => h.to_string(),
            TypedHeader::Supported(h) => h.to_string(),
            TypedHeader::Unsupported(h) => h.to_string(),
            TypedHeader::Allow(h) => h.to_string(),
            TypedHeader::Accept(h) => h.to_string(),
            TypedHeader::RetryAfter(h) => h.to_string(),
            TypedHeader::WwwAuthenticate(h) => h.to_string(),
            TypedHeader::ProxyAuthenticate(h) => h.to_string(),
            TypedHeader::Authorization(h) => h.to_string(),
            TypedHeader::ProxyAuthorization(h) => h.to_string(),
            TypedHeader::Raw(r) => r.value.clone(),
        }
    }
}

impl fmt::Display for TypedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.value_string())
    }
}

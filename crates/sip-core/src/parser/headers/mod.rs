//! Per-header-name parsers. [`dispatch`] is the single entry point the
//! message parser calls for every header line; it returns a
//! [`TypedHeader`] on success or a recoverable [`crate::error::Error`]
//! that the caller downgrades to a [`crate::error::ParseDiagnostic`]
//! and a [`crate::types::header::RawHeader`] fallback rather than
//! aborting the whole message.
use nom::{
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, digit1},
    combinator::{map_res, opt},
    multi::separated_list0,
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, SyntaxKind};
use crate::parser::message::split_top_level_commas;
use crate::parser::separators::{comma, semi};
use crate::parser::token::{quoted_string, token};
use crate::parser::uri::{generic_param, name_addr};
use crate::types::accept::{Accept, AcceptEntry};
use crate::types::allow::Allow;
use crate::types::auth::{Challenge, Credentials};
use crate::types::call_id::CallId;
use crate::types::contact::{Contact, ContactBinding};
use crate::types::content_length::ContentLength;
use crate::types::content_type::ContentType;
use crate::types::cseq::CSeq;
use crate::types::expires::Expires;
use crate::types::headers::header_name::HeaderName;
use crate::types::headers::typed_header::TypedHeader;
use crate::types::max_forwards::MaxForwards;
use crate::types::method::Method;
use crate::types::min_expires::MinExpires;
use crate::types::param::{Param, ParamList};
use crate::types::require::Require;
use crate::types::retry_after::RetryAfter;
use crate::types::route::{RecordRoute, Route, RouteEntry};
use crate::types::supported::Supported;
use crate::types::to::To;
use crate::types::unsupported::Unsupported;
use crate::types::via::{Via, ViaTransport};
use std::str::FromStr;

fn param_list(input: &str) -> IResult<&str, ParamList> {
    let (rest, params) = nom::multi::many0(preceded(semi, generic_param))(input)?;
    Ok((rest, ParamList(params)))
}

fn from_or_to_value(input: &str) -> IResult<&str, (Option<String>, crate::types::uri::Uri, ParamList)> {
    let (rest, na) = name_addr(input)?;
    let (rest, params) = param_list(rest)?;
    Ok((rest, (na.display_name, *na.uri, params)))
}

fn parse_from(value: &str) -> Result<TypedHeader, Error> {
    let (_, (display_name, uri, params)) = from_or_to_value(value)
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad From: {e}")))?;
    Ok(TypedHeader::From(crate::types::from::From { display_name, uri, params }))
}

fn parse_to(value: &str) -> Result<TypedHeader, Error> {
    let (_, (display_name, uri, params)) = from_or_to_value(value)
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad To: {e}")))?;
    Ok(TypedHeader::To(To { display_name, uri, params }))
}

fn contact_binding(input: &str) -> IResult<&str, ContactBinding> {
    let (rest, na) = name_addr(input)?;
    let (rest, params) = param_list(rest)?;
    Ok((rest, ContactBinding { display_name: na.display_name, uri: *na.uri, params }))
}

fn parse_contact(value: &str) -> Result<TypedHeader, Error> {
    let trimmed = value.trim();
    if trimmed == "*" {
        return Ok(TypedHeader::Contact(Contact::Star));
    }
    let (_, bindings) = separated_list0(comma, contact_binding)(trimmed)
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad Contact: {e}")))?;
    Ok(TypedHeader::Contact(Contact::Bindings(bindings)))
}

fn route_entry(input: &str) -> IResult<&str, RouteEntry> {
    let (rest, na) = name_addr(input)?;
    let (rest, params) = param_list(rest)?;
    Ok((rest, RouteEntry { display_name: na.display_name, uri: *na.uri, params }))
}

fn parse_route(value: &str) -> Result<TypedHeader, Error> {
    let (_, entries) = separated_list0(comma, route_entry)(value.trim())
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad Route: {e}")))?;
    Ok(TypedHeader::Route(Route(entries)))
}

fn parse_record_route(value: &str) -> Result<TypedHeader, Error> {
    let (_, entries) = separated_list0(comma, route_entry)(value.trim())
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad Record-Route: {e}")))?;
    Ok(TypedHeader::RecordRoute(RecordRoute(entries)))
}

fn parse_call_id(value: &str) -> Result<TypedHeader, Error> {
    Ok(TypedHeader::CallId(CallId::new(value.trim())))
}

fn cseq_value(input: &str) -> IResult<&str, CSeq> {
    let (rest, (seq, _, m)) = tuple((
        map_res(digit1, |d: &str| d.parse::<u32>()),
        nom::character::complete::space1,
        token,
    ))(input)?;
    let method = Method::from_str(m).unwrap_or_else(|_| Method::Extension(m.to_string()));
    Ok((rest, CSeq { seq, method }))
}

fn parse_cseq(value: &str) -> Result<TypedHeader, Error> {
    let (_, cseq) = cseq_value(value.trim())
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad CSeq: {e}")))?;
    Ok(TypedHeader::CSeq(cseq))
}

fn via_transport(input: &str) -> IResult<&str, ViaTransport> {
    let (rest, _) = tag_no_case("SIP")(input)?;
    let (rest, _) = char('/')(rest)?;
    let (rest, _) = take_while1(|c: char| c.is_ascii_digit() || c == '.')(rest)?;
    let (rest, _) = char('/')(rest)?;
    let (rest, t) = token(rest)?;
    let transport = ViaTransport::from_str(t)
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))?;
    Ok((rest, transport))
}

fn via_value(input: &str) -> IResult<&str, Via> {
    let (rest, transport) = via_transport(input)?;
    let (rest, _) = nom::character::complete::space1(rest)?;
    let (rest, host) = crate::parser::token::host(rest)?;
    let (rest, port) = opt(preceded(char(':'), map_res(digit1, |d: &str| d.parse::<u16>())))(rest)?;
    let (rest, params) = param_list(rest)?;
    Ok((rest, Via { transport, host: host.to_string(), port: port.unwrap_or(0), params }))
}

fn parse_via(value: &str) -> Result<TypedHeader, Error> {
    let (_, via) = via_value(value.trim())
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad Via: {e}")))?;
    Ok(TypedHeader::Via(via))
}

fn parse_max_forwards(value: &str) -> Result<TypedHeader, Error> {
    let n: u8 = value
        .trim()
        .parse()
        .map_err(|_| Error::syntax(SyntaxKind::Header, "bad Max-Forwards"))?;
    Ok(TypedHeader::MaxForwards(MaxForwards(n)))
}

fn parse_content_length(value: &str) -> Result<TypedHeader, Error> {
    let n: u32 = value
        .trim()
        .parse()
        .map_err(|_| Error::syntax(SyntaxKind::Header, "bad Content-Length"))?;
    Ok(TypedHeader::ContentLength(ContentLength(n)))
}

fn media_type_value(input: &str) -> IResult<&str, (String, String, ParamList)> {
    let (rest, (mtype, _, msub)) = tuple((token, char('/'), token))(input)?;
    let (rest, params) = param_list(rest)?;
    Ok((rest, (mtype.to_string(), msub.to_string(), params)))
}

fn parse_content_type(value: &str) -> Result<TypedHeader, Error> {
    let (_, (media_type, media_subtype, params)) = media_type_value(value.trim())
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad Content-Type: {e}")))?;
    Ok(TypedHeader::ContentType(ContentType { media_type, media_subtype, params }))
}

fn parse_expires(value: &str) -> Result<TypedHeader, Error> {
    let n: u32 = value.trim().parse().map_err(|_| Error::syntax(SyntaxKind::Header, "bad Expires"))?;
    Ok(TypedHeader::Expires(Expires(n)))
}

fn parse_min_expires(value: &str) -> Result<TypedHeader, Error> {
    let n: u32 = value.trim().parse().map_err(|_| Error::syntax(SyntaxKind::Header, "bad Min-Expires"))?;
    Ok(TypedHeader::MinExpires(MinExpires(n)))
}

fn token_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn parse_require(value: &str) -> Result<TypedHeader, Error> {
    Ok(TypedHeader::Require(Require(token_list(value))))
}

fn parse_supported(value: &str) -> Result<TypedHeader, Error> {
    Ok(TypedHeader::Supported(Supported(token_list(value))))
}

fn parse_unsupported(value: &str) -> Result<TypedHeader, Error> {
    Ok(TypedHeader::Unsupported(Unsupported(token_list(value))))
}

fn parse_allow(value: &str) -> Result<TypedHeader, Error> {
    let methods = token_list(value)
        .into_iter()
        .map(|m| Method::from_str(&m).unwrap_or(Method::Extension(m)))
        .collect();
    Ok(TypedHeader::Allow(Allow(methods)))
}

fn accept_entry(input: &str) -> IResult<&str, AcceptEntry> {
    let (rest, (media_type, media_subtype, params)) = media_type_value(input)?;
    Ok((rest, AcceptEntry { media_type, media_subtype, params }))
}

fn parse_accept(value: &str) -> Result<TypedHeader, Error> {
    let (_, entries) = separated_list0(comma, accept_entry)(value.trim())
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad Accept: {e}")))?;
    Ok(TypedHeader::Accept(Accept(entries)))
}

fn parse_retry_after(value: &str) -> Result<TypedHeader, Error> {
    let (rest, seconds) = map_res(digit1, |d: &str| d.parse::<u32>())(value.trim())
        .map_err(|e: nom::Err<nom::error::Error<&str>>| Error::syntax(SyntaxKind::Header, format!("bad Retry-After: {e}")))?;
    let (_, params) = param_list(rest.trim_start())
        .map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad Retry-After: {e}")))?;
    Ok(TypedHeader::RetryAfter(RetryAfter { seconds, comment: None, params }))
}

/// A single `auth-param` (RFC 3261 §25.1): `token "=" (token / quoted-string)`.
fn auth_param(input: &str) -> Result<Param, Error> {
    let (rest, name) = token(input).map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad auth-param: {e}")))?;
    let rest = rest
        .trim_start()
        .strip_prefix('=')
        .ok_or_else(|| Error::syntax(SyntaxKind::Header, "bad auth-param: missing '='"))?
        .trim_start();
    if rest.starts_with('"') {
        let (_, value) = quoted_string(rest).map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad auth-param: {e}")))?;
        Ok(Param::with_quoted_value(name, value))
    } else {
        let (_, value) = token(rest).map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad auth-param: {e}")))?;
        Ok(Param::with_value(name, value))
    }
}

/// `challenge`/`credentials` (RFC 3261 §25.1): an auth scheme followed by
/// a comma-separated `auth-param` list, e.g. `Digest realm="atlanta.com",
/// nonce="...", algorithm=MD5`.
fn auth_scheme_and_params(value: &str) -> Result<(String, ParamList), Error> {
    let value = value.trim();
    let (rest, scheme) = token(value).map_err(|e| Error::syntax(SyntaxKind::Header, format!("bad auth header: {e}")))?;
    let mut params = ParamList::new();
    for part in split_top_level_commas(rest.trim_start()) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        params.push(auth_param(part)?);
    }
    Ok((scheme.to_string(), params))
}

fn parse_www_authenticate(value: &str) -> Result<TypedHeader, Error> {
    let (scheme, params) = auth_scheme_and_params(value)?;
    Ok(TypedHeader::WwwAuthenticate(Challenge { scheme, params }))
}

fn parse_proxy_authenticate(value: &str) -> Result<TypedHeader, Error> {
    let (scheme, params) = auth_scheme_and_params(value)?;
    Ok(TypedHeader::ProxyAuthenticate(Challenge { scheme, params }))
}

fn parse_authorization(value: &str) -> Result<TypedHeader, Error> {
    let (scheme, params) = auth_scheme_and_params(value)?;
    Ok(TypedHeader::Authorization(Credentials { scheme, params }))
}

fn parse_proxy_authorization(value: &str) -> Result<TypedHeader, Error> {
    let (scheme, params) = auth_scheme_and_params(value)?;
    Ok(TypedHeader::ProxyAuthorization(Credentials { scheme, params }))
}

/// Parses a single header's value given its already-resolved
/// [`HeaderName`]. Returns `Ok` with the typed header, or `Err` with a
/// diagnostic the caller should record while still keeping the message
/// (RFC 3261's "be liberal in what you accept" principle applied at the
/// header granularity rather than the message granularity).
pub fn dispatch(name: &HeaderName, value: &str) -> Result<TypedHeader, Error> {
    match name {
        HeaderName::From => parse_from(value),
        HeaderName::To => parse_to(value),
        HeaderName::Contact => parse_contact(value),
        HeaderName::CallId => parse_call_id(value),
        HeaderName::CSeq => parse_cseq(value),
        HeaderName::Via => parse_via(value),
        HeaderName::Route => parse_route(value),
        HeaderName::RecordRoute => parse_record_route(value),
        HeaderName::MaxForwards => parse_max_forwards(value),
        HeaderName::ContentLength => parse_content_length(value),
        HeaderName::ContentType => parse_content_type(value),
        HeaderName::Expires => parse_expires(value),
        HeaderName::MinExpires => parse_min_expires(value),
        HeaderName::Require => parse_require(value),
        HeaderName::Supported => parse_supported(value),
        HeaderName::Unsupported => parse_unsupported(value),
        HeaderName::Allow => parse_allow(value),
        HeaderName::Accept => parse_accept(value),
        HeaderName::RetryAfter => parse_retry_after(value),
        HeaderName::WwwAuthenticate => parse_www_authenticate(value),
        HeaderName::ProxyAuthenticate => parse_proxy_authenticate(value),
        HeaderName::Authorization => parse_authorization(value),
        HeaderName::ProxyAuthorization => parse_proxy_authorization(value),
        other => Ok(TypedHeader::Raw(crate::types::header::RawHeader::new(other.clone(), value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_parses_via_with_branch() {
        let h = dispatch(&HeaderName::Via, "SIP/2.0/UDP 192.0.2.1:5060;branch=z9hG4bK776asdhds").unwrap();
        match h {
            TypedHeader::Via(v) => {
                assert_eq!(v.host, "192.0.2.1");
                assert_eq!(v.port, 5060);
                assert_eq!(v.branch(), Some("z9hG4bK776asdhds"));
            }
            _ => panic!("expected Via"),
        }
    }

    #[test]
    fn dispatch_falls_back_to_raw_for_unknown_header() {
        let h = dispatch(&HeaderName::Other("X-Custom".into()), "value").unwrap();
        assert!(matches!(h, TypedHeader::Raw(_)));
    }

    #[test]
    fn dispatch_parses_a_digest_challenge() {
        let h = dispatch(&HeaderName::WwwAuthenticate, r#"Digest realm="atlanta.com", nonce="84a4cc6f", qop="auth", algorithm=MD5"#).unwrap();
        match h {
            TypedHeader::WwwAuthenticate(c) => {
                assert_eq!(c.scheme, "Digest");
                assert_eq!(c.realm(), Some("atlanta.com"));
                assert_eq!(c.nonce(), Some("84a4cc6f"));
                assert_eq!(c.qop(), Some("auth"));
                assert_eq!(c.algorithm(), Some("MD5"));
            }
            _ => panic!("expected WwwAuthenticate"),
        }
    }

    #[test]
    fn dispatch_parses_cseq() {
        let h = dispatch(&HeaderName::CSeq, "314159 INVITE").unwrap();
        match h {
            TypedHeader::CSeq(c) => {
                assert_eq!(c.seq, 314159);
                assert_eq!(c.method, Method::Invite);
            }
            _ => panic!("expected CSeq"),
        }
    }
}

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::char,
    combinator::{map, opt},
    sequence::{preceded, tuple},
    IResult,
};

use crate::parser::separators::semi;
use crate::parser::token::{quoted_string, token};
use crate::types::param::Param;
use crate::types::uri::{NameAddr, Scheme, SipUri, TelUri, Uri};

fn user_info(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (rest, user) = take_while1(|c: char| c != ':' && c != '@' && !c.is_whitespace())(input)?;
    let (rest, password) = opt(preceded(char(':'), take_while(|c: char| c != '@' && !c.is_whitespace())))(rest)?;
    let (rest, _) = char('@')(rest)?;
    Ok((rest, (user, password)))
}

fn host_port(input: &str) -> IResult<&str, (&str, u16)> {
    let (rest, host) = take_while1(|c: char| !":;?, \t\r\n>".contains(c))(input)?;
    let (rest, port) = opt(preceded(char(':'), nom::character::complete::digit1))(rest)?;
    let port = port.and_then(|p| p.parse().ok()).unwrap_or(0);
    Ok((rest, (host, port)))
}

fn uri_param(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (rest, name) = token(input)?;
    let (rest, value) = opt(preceded(char('='), alt((token, take_while1(|c: char| !";>? \t\r\n".contains(c))))))(rest)?;
    Ok((rest, (name, value)))
}

/// Parses a `sip:`/`sips:` URI starting at the scheme.
pub fn sip_uri(input: &str) -> IResult<&str, SipUri> {
    let (rest, secure) = alt((map(tag_no_case("sips:"), |_| true), map(tag_no_case("sip:"), |_| false)))(input)?;
    let (rest, userinfo) = opt(user_info)(rest)?;
    let (rest, (host, port)) = host_port(rest)?;

    let mut uri = SipUri::new(host.to_string());
    uri.secure = secure;
    uri.port = port;
    if let Some((user, password)) = userinfo {
        uri.user = Some(user.to_string());
        uri.password = password.map(|p| p.to_string());
    }

    let mut remaining = rest;
    loop {
        match preceded(semi, uri_param)(remaining) {
            Ok((next, (name, value))) => {
                match name.to_ascii_lowercase().as_str() {
                    "user" => uri.user_param = value.map(|v| v.to_string()),
                    "method" => uri.method_param = value.map(|v| v.to_string()),
                    "transport" => uri.transport_param = value.map(|v| v.to_string()),
                    "ttl" => uri.ttl_param = value.and_then(|v| v.parse().ok()),
                    "maddr" => uri.maddr_param = value.map(|v| v.to_string()),
                    "lr" => uri.lr_param = true,
                    _ => {
                        uri.other_params.push(';');
                        uri.other_params.push_str(name);
                        if let Some(v) = value {
                            uri.other_params.push('=');
                            uri.other_params.push_str(v);
                        }
                    }
                }
                remaining = next;
            }
            Err(_) => break,
        }
    }

    // Anything left that starts with `?` is the opaque header-param tail;
    // anything else ends the URI here (caller keeps parsing).
    if let Some(rest_after) = remaining.strip_prefix('?') {
        let end = rest_after
            .find(|c: char| c == '>' || c == ',' || c.is_whitespace())
            .unwrap_or(rest_after.len());
        uri.header_params = format!("?{}", &rest_after[..end]);
        remaining = &rest_after[end..];
    }

    Ok((remaining, uri))
}

/// Parses a `tel:` URI starting at the scheme.
pub fn tel_uri(input: &str) -> IResult<&str, TelUri> {
    let (rest, _) = tag_no_case("tel:")(input)?;
    let (rest, number) = take_while1(|c: char| !";>, \t\r\n".contains(c))(rest)?;
    let (rest, params) = take_while(|c: char| c != '>' && c != ',' && !c.is_whitespace())(rest)?;
    Ok((rest, TelUri { number: number.to_string(), params: params.to_string() }))
}

/// Dispatches to [`sip_uri`] or [`tel_uri`] by scheme, producing a bare
/// `Uri` (no `name-addr` wrapping — see [`name_addr`] for that).
pub fn uri(input: &str) -> IResult<&str, Uri> {
    alt((map(sip_uri, Uri::Sip), map(tel_uri, Uri::Tel)))(input)
}

fn display_name(input: &str) -> IResult<&str, Option<String>> {
    alt((
        map(quoted_string, Some),
        map(
            tuple((
                take_while1(|c: char| c.is_alphanumeric() || c == ' ' || c == '-' || c == '.'),
                nom::character::complete::space0,
            )),
            |(name, _): (&str, &str)| {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            },
        ),
        map(nom::combinator::success(()), |_| None),
    ))(input)
}

/// Parses a `name-addr` (`[display-name] "<" addr-spec ">"`) or a bare
/// `addr-spec`, producing a [`NameAddr`] either way so callers (From/To/
/// Contact/Route headers) don't need two code paths.
pub fn name_addr(input: &str) -> IResult<&str, NameAddr> {
    let (rest, name) = opt(display_name)(input)?;
    let name = name.flatten();
    let rest = rest.trim_start();

    if let Some(inner) = rest.strip_prefix('<') {
        let (after, u) = uri(inner)?;
        let after = after.strip_prefix('>').ok_or_else(|| {
            nom::Err::Error(nom::error::Error::new(after, nom::error::ErrorKind::Char))
        })?;
        Ok((after, NameAddr { display_name: name, angle_brackets: true, uri: Box::new(u) }))
    } else {
        let (after, u) = uri(rest)?;
        Ok((after, NameAddr { display_name: name, angle_brackets: false, uri: Box::new(u) }))
    }
}

/// A convenience wrapper that produces a [`Param`] list entry from a
/// `;name[=value]` pair, reused by header parsers that carry generic
/// params after a `name-addr` (From/To/Contact/Route/Record-Route).
pub fn generic_param(input: &str) -> IResult<&str, Param> {
    let (rest, (name, value)) = uri_param(input)?;
    Ok((
        rest,
        match value {
            Some(v) => Param::with_value(name, v),
            None => Param::new(name),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sip_uri_parses_user_host_and_params() {
        let (rest, u) = sip_uri("sip:alice@example.com;transport=tcp").unwrap();
        assert_eq!(rest, "");
        assert_eq!(u.user.as_deref(), Some("alice"));
        assert_eq!(u.host, "example.com");
        assert_eq!(u.transport_param.as_deref(), Some("tcp"));
    }

    #[test]
    fn name_addr_parses_angle_bracket_form() {
        let (rest, na) = name_addr("\"Alice\" <sip:alice@example.com>;tag=abc").unwrap();
        assert_eq!(na.display_name.as_deref(), Some("Alice"));
        assert!(na.angle_brackets);
        assert_eq!(rest, ";tag=abc");
    }

    #[test]
    fn name_addr_parses_bare_addr_spec() {
        let (rest, na) = name_addr("sip:bob@example.com").unwrap();
        assert!(!na.angle_brackets);
        assert_eq!(rest, "");
    }
}

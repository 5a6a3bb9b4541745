use std::str::FromStr;

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{digit1, space1},
    combinator::map_res,
    sequence::tuple,
    IResult,
};

use crate::error::{Error, ParseDiagnostic, SyntaxKind};
use crate::parser::headers;
use crate::types::headers::header_name::HeaderName;
use crate::types::headers::typed_header::TypedHeader;
use crate::types::message::Message;
use crate::types::method::Method;
use crate::types::request::Request;
use crate::types::response::Response;
use crate::types::status::StatusCode;

/// The result of parsing a complete message: the message itself plus any
/// header-level diagnostics the parser recovered from instead of
/// aborting (RFC 3261's liberal-acceptance principle applied per-header,
/// see [`crate::error::SyntaxKind::Header`]).
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub message: Message,
    pub diagnostics: Vec<ParseDiagnostic>,
}

fn request_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, (method, _, uri, _, _version)) =
        tuple((take_while1(|c: char| !c.is_whitespace()), space1, take_while1(|c: char| !c.is_whitespace()), space1, take_while1(|c: char| c != '\r' && c != '\n')))(input)?;
    Ok((rest, (method, uri)))
}

fn status_line(input: &str) -> IResult<&str, (u16, &str)> {
    let (rest, (_version, _, code, _, reason)) = tuple((
        tag("SIP/2.0"),
        space1,
        map_res(digit1, |d: &str| d.parse::<u16>()),
        space1,
        take_while1(|c: char| c != '\r' && c != '\n'),
    ))(input)?;
    Ok((rest, (code, reason)))
}

/// Splits a message into its start line, the raw (unfolded) header
/// block, and the body, given the full message bytes.
fn split_message(input: &str) -> Result<(&str, &str, &str), Error> {
    let idx = input
        .find("\r\n\r\n")
        .or_else(|| input.find("\n\n"))
        .ok_or_else(|| Error::syntax(SyntaxKind::Framing, "no header/body boundary found"))?;
    let (head, rest) = input.split_at(idx);
    let sep_len = if rest.starts_with("\r\n\r\n") { 4 } else { 2 };
    let body = &rest[sep_len..];

    let line_end = head.find("\r\n").or_else(|| head.find('\n')).unwrap_or(head.len());
    let (start, headers_block) = head.split_at(line_end);
    let headers_block = headers_block.trim_start_matches("\r\n").trim_start_matches('\n');
    Ok((start, headers_block, body))
}

/// Unfolds RFC 3261 §7.3.1 LWS continuation lines (a header value may
/// span multiple wire lines if each continuation starts with whitespace)
/// and splits the header block into raw `(name, value)` pairs in wire
/// order.
fn unfold_headers(block: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut current: Option<(String, String)> = None;
    for raw_line in block.split("\n") {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            continue;
        }
        if (line.starts_with(' ') || line.starts_with('\t')) && current.is_some() {
            let (_, value) = current.as_mut().unwrap();
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        if let Some(pair) = current.take() {
            pairs.push(pair);
        }
        if let Some(colon) = line.find(':') {
            let name = line[..colon].trim().to_string();
            let value = line[colon + 1..].trim().to_string();
            current = Some((name, value));
        }
        // A line with no colon and not a continuation is dropped: it
        // can't be a valid header, and aborting the whole message over
        // one malformed line would violate the liberal-acceptance rule.
    }
    if let Some(pair) = current.take() {
        pairs.push(pair);
    }
    pairs
}

fn build_headers(pairs: Vec<(String, String)>) -> (Vec<TypedHeader>, Vec<ParseDiagnostic>) {
    let mut headers_out = Vec::with_capacity(pairs.len());
    let mut diagnostics = Vec::new();
    for (line_no, (raw_name, raw_value)) in pairs.into_iter().enumerate() {
        let name = HeaderName::from_str(&raw_name).unwrap_or_else(|_| HeaderName::Other(raw_name.clone()));
        if name.is_list_valued() {
            for part in split_top_level_commas(&raw_value) {
                match headers::dispatch(&name, part.trim()) {
                    Ok(h) => headers_out.push(h),
                    Err(e) => {
                        diagnostics.push(ParseDiagnostic {
                            line: line_no,
                            col: 0,
                            header_name: raw_name.clone(),
                            kind: SyntaxKind::Header,
                            message: e.to_string(),
                        });
                        headers_out.push(TypedHeader::Raw(crate::types::header::RawHeader::new(name.clone(), part)));
                    }
                }
            }
        } else {
            match headers::dispatch(&name, &raw_value) {
                Ok(h) => headers_out.push(h),
                Err(e) => {
                    diagnostics.push(ParseDiagnostic {
                        line: line_no,
                        col: 0,
                        header_name: raw_name.clone(),
                        kind: SyntaxKind::Header,
                        message: e.to_string(),
                    });
                    headers_out.push(TypedHeader::Raw(crate::types::header::RawHeader::new(name, raw_value)));
                }
            }
        }
    }
    (headers_out, diagnostics)
}

/// Splits on commas that are not inside a quoted string, so a
/// list-valued header's comma-separated entries don't get cut in the
/// middle of a quoted display name.
pub(crate) fn split_top_level_commas(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => depth += 1,
            '>' if !in_quotes => depth -= 1,
            ',' if !in_quotes && depth <= 0 => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Parses one complete message (start line + headers + body) out of
/// `input`, which must contain exactly that much data. Used directly for
/// datagram transports, and by the stream framer once it has determined
/// a full message is buffered (see [`crate::parser::framing`]).
pub fn parse(input: &[u8]) -> Result<ParseOutcome, Error> {
    let text = std::str::from_utf8(input).map_err(|e| Error::syntax(SyntaxKind::StartLine, e.to_string()))?;
    let (start, headers_block, body) = split_message(text)?;
    let pairs = unfold_headers(headers_block);
    let (headers_out, diagnostics) = build_headers(pairs);
    let body_bytes = bytes::Bytes::copy_from_slice(body.as_bytes());

    if start.trim_start().starts_with("SIP/2.0") {
        let (_, (code, reason)) =
            status_line(start).map_err(|e| Error::syntax(SyntaxKind::StartLine, format!("bad status line: {e}")))?;
        let status = StatusCode::new(code).map_err(|_| Error::InvalidStatusCode(code))?;
        let response = Response { status, reason: reason.trim().to_string(), headers: headers_out, body: body_bytes };
        Ok(ParseOutcome { message: Message::Response(response), diagnostics })
    } else {
        let (_, (method_str, uri_str)) =
            request_line(start).map_err(|e| Error::syntax(SyntaxKind::StartLine, format!("bad request line: {e}")))?;
        let method = Method::from_str(method_str)?;
        let (_, uri) = crate::parser::uri::uri(uri_str).map_err(|e| Error::syntax(SyntaxKind::StartLine, format!("bad request-uri: {e}")))?;
        let request = Request { method, uri, headers: headers_out, body: body_bytes };
        Ok(ParseOutcome { message: Message::Request(request), diagnostics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE: &str = "INVITE sip:bob@example.com SIP/2.0\r\n\
Via: SIP/2.0/UDP pc33.example.com;branch=z9hG4bK776asdhds\r\n\
Max-Forwards: 70\r\n\
To: Bob <sip:bob@example.com>\r\n\
From: Alice <sip:alice@example.com>;tag=1928301774\r\n\
Call-ID: a84b4c76e66710@pc33.example.com\r\n\
CSeq: 314159 INVITE\r\n\
Contact: <sip:alice@pc33.example.com>\r\n\
Content-Length: 0\r\n\
\r\n";

    #[test]
    fn parses_basic_invite() {
        let outcome = parse(INVITE.as_bytes()).unwrap();
        assert!(outcome.diagnostics.is_empty());
        let req = outcome.message.as_request().unwrap();
        assert_eq!(req.method, Method::Invite);
        assert_eq!(req.call_id(), Some("a84b4c76e66710@pc33.example.com"));
        assert_eq!(req.cseq().unwrap().seq, 314159);
        assert_eq!(req.top_via().unwrap().branch(), Some("z9hG4bK776asdhds"));
    }

    #[test]
    fn parses_basic_response() {
        let resp = "SIP/2.0 200 OK\r\nCall-ID: abc@host\r\nCSeq: 1 INVITE\r\nContent-Length: 0\r\n\r\n";
        let outcome = parse(resp.as_bytes()).unwrap();
        let r = outcome.message.as_response().unwrap();
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.reason, "OK");
    }

    #[test]
    fn recovers_from_one_bad_header_without_failing_whole_message() {
        let msg = "INVITE sip:bob@example.com SIP/2.0\r\nMax-Forwards: not-a-number\r\nCall-ID: x@y\r\nCSeq: 1 INVITE\r\nContent-Length: 0\r\n\r\n";
        let outcome = parse(msg.as_bytes()).unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].header_name, "Max-Forwards");
    }
}

use nom::{
    bytes::complete::take_while,
    character::complete::char,
    combinator::value,
    sequence::tuple,
    IResult,
};

use crate::parser::common_chars::is_ws;

/// Optional linear whitespace, RFC 3261 `LWS` (folding not modeled here;
/// the framer unfolds continuation lines before this parser ever sees
/// them, per §4.1 of the header-handling design).
pub fn lws(input: &str) -> IResult<&str, &str> {
    take_while(is_ws)(input)
}

/// `HCOLON = *WSP ":" SWS`, the separator between a header name and its
/// value.
pub fn hcolon(input: &str) -> IResult<&str, ()> {
    value((), tuple((lws, char(':'), lws)))(input)
}

/// `SEMI = SWS ";" SWS`.
pub fn semi(input: &str) -> IResult<&str, ()> {
    value((), tuple((lws, char(';'), lws)))(input)
}

/// `COMMA = SWS "," SWS`.
pub fn comma(input: &str) -> IResult<&str, ()> {
    value((), tuple((lws, char(','), lws)))(input)
}

/// `EQUAL = SWS "=" SWS`.
pub fn equal(input: &str) -> IResult<&str, ()> {
    value((), tuple((lws, char('='), lws)))(input)
}

/// `SLASH = SWS "/" SWS`.
pub fn slash(input: &str) -> IResult<&str, ()> {
    value((), tuple((lws, char('/'), lws)))(input)
}

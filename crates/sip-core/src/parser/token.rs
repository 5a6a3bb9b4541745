use nom::{
    bytes::complete::{tag, take_while1},
    error::{Error as NomError, ErrorKind},
    Err as NomErr, IResult,
};

use crate::parser::common_chars::is_token_char;

/// `token`, RFC 3261 §25.1.
pub fn token(input: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(input)
}

/// `word`, used for `Call-ID` and a few other "looser than token"
/// productions that also allow `()<>:\"/[]?{}` inside the run.
pub fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| is_token_char(c) || "()<>:\\\"/[]?{}".contains(c))(input)
}

/// `quoted-string`, RFC 3261 §25.1: a `"`-delimited run with `\`-escaping.
///
/// Hand-scanned rather than composed from nom's `escaped` family: the
/// escape set for a quoted-string is "any character", which doesn't fit
/// `escaped`'s fixed-escapable-set model cleanly.
pub fn quoted_string(input: &str) -> IResult<&str, String> {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, '"')) => {}
        _ => return Err(NomErr::Error(NomError::new(input, ErrorKind::Char))),
    }

    let mut out = String::new();
    let mut escaping = false;
    for (idx, c) in chars {
        if escaping {
            out.push(c);
            escaping = false;
            continue;
        }
        match c {
            '\\' => escaping = true,
            '"' => {
                let rest = &input[idx + c.len_utf8()..];
                return Ok((rest, out));
            }
            _ => out.push(c),
        }
    }
    Err(NomErr::Error(NomError::new(input, ErrorKind::Eof)))
}

/// `host`, parsed loosely here: anything but the characters that end a
/// host production in context (`:`, `;`, `?`, `,`, whitespace, `>`).
pub fn host(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !":;?, \t\r\n>".contains(c))(input)
}

/// A bare `tag(s)` combinator wrapper used for case-insensitive literal
/// matching in places where nom's `tag_no_case` reads awkwardly inline.
pub fn literal<'a>(lit: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    move |input| tag(lit)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_string_unescapes_backslash_pairs() {
        let (rest, value) = quoted_string("\"a\\\"b\" trailer").unwrap();
        assert_eq!(value, "a\"b");
        assert_eq!(rest, " trailer");
    }

    #[test]
    fn token_stops_at_separator() {
        let (rest, tok) = token("INVITE sip:bob@example.com").unwrap();
        assert_eq!(tok, "INVITE");
        assert_eq!(rest, " sip:bob@example.com");
    }
}

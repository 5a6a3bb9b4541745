//! Character classes shared by the parser, drawn from the RFC 3261 §25.1
//! core grammar (`token`, `separators`, `LWS`).

pub fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c)
}

pub fn is_separator(c: char) -> bool {
    "()<>@,;:\\\"/[]?={} \t".contains(c)
}

pub fn is_ws(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic()
}

pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

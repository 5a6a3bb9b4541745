//! The message parser: character classes and separators at the bottom,
//! per-header value parsers in [`headers`], the URI grammar in [`uri`],
//! start-line and whole-message assembly in [`message`], and the
//! datagram-vs-stream boundary detector in [`framing`].
pub mod common_chars;
pub mod framing;
pub mod headers;
pub mod message;
pub mod separators;
pub mod token;
pub mod uri;

pub use framing::{message_length, FramingMode};
pub use message::{parse, ParseOutcome};

/// Parses a complete message and discards recovered header diagnostics,
/// for callers (transports) that just want the message or a hard
/// failure and log diagnostics at a different granularity than this
/// crate does.
pub fn parse_message(input: &[u8]) -> crate::error::Result<crate::types::Message> {
    parse(input).map(|outcome| outcome.message)
}

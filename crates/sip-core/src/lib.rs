//! The SIP (RFC 3261) message model: typed header types, a recovering
//! nom-based parser, a fixed-buffer printer, and fluent builders.
//!
//! Parsing is liberal at the header granularity (a malformed header is
//! recorded as a [`error::ParseDiagnostic`] and kept as a
//! [`types::header::RawHeader`] rather than failing the whole message)
//! and strict at the start-line and framing granularity, matching the
//! error-handling split the rest of the engine expects (see
//! [`error::SyntaxKind`]).
//!
//! ```
//! use sip_core::prelude::*;
//!
//! let invite = RequestBuilder::new(Method::Invite, Uri::sip("bob@example.com"))
//!     .via(ViaTransport::Udp, "pc33.example.com")
//!     .from(Uri::sip("alice@example.com"), "1928301774")
//!     .to(Uri::sip("bob@example.com"))
//!     .call_id("a84b4c76e66710@pc33.example.com")
//!     .cseq(314159)
//!     .build();
//!
//! let wire = invite.to_string();
//! let outcome = sip_core::parser::parse(wire.as_bytes()).unwrap();
//! assert!(outcome.message.is_request());
//! ```
pub mod builder;
pub mod digest;
pub mod error;
pub mod parser;
pub mod types;

pub mod prelude {
    pub use crate::builder::{ack_for_2xx, ack_for_non_2xx, cancel_for, RequestBuilder, ResponseBuilder};
    pub use crate::error::{Error, ParseDiagnostic, Result, SyntaxKind};
    pub use crate::parser::{parse, FramingMode};
    pub use crate::types::auth::{Challenge, Credentials as AuthCredentials};
    pub use crate::types::{Message, Method, Request, Response, StatusCode, Uri};
    pub use crate::types::via::ViaTransport;
}

//! The SIP message data model: methods, status codes, URIs, the header
//! registry, and the `Request`/`Response`/`Message` envelopes that tie
//! them together.
pub mod accept;
pub mod allow;
pub mod auth;
pub mod branch;
pub mod call_id;
pub mod contact;
pub mod content_length;
pub mod content_type;
pub mod cseq;
pub mod expires;
pub mod from;
pub mod header;
pub mod headers;
pub mod max_forwards;
pub mod message;
pub mod method;
pub mod min_expires;
pub mod param;
pub mod request;
pub mod require;
pub mod response;
pub mod retry_after;
pub mod route;
pub mod status;
pub mod supported;
pub mod to;
pub mod unsupported;
pub mod uri;
pub mod via;

pub use headers::{HeaderName, TypedHeader};
pub use message::Message;
pub use method::Method;
pub use request::Request;
pub use response::Response;
pub use status::StatusCode;
pub use uri::{NameAddr, Scheme, SipUri, TelUri, Uri};

//! Cross-crate event plumbing for transports: one adapter per bound
//! transport fans its [`crate::transport::TransportEvent`] stream out to
//! however many consumers (transaction layer, tests) need it.
pub mod adapter;

pub use adapter::TransportEventAdapter;

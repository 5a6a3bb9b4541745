//! Server transaction logic: INVITE (§17.2.1) and non-INVITE (§17.2.2).
pub mod ist;
pub mod nist;

pub use ist::InviteServerLogic;
pub use nist::NonInviteServerLogic;

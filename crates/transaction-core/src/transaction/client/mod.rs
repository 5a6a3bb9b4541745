//! Client transaction logic: INVITE (§17.1.1) and non-INVITE (§17.1.2).
pub mod ict;
pub mod nict;

pub use ict::InviteClientLogic;
pub use nict::NonInviteClientLogic;

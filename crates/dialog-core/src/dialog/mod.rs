mod auth;
mod dialog_impl;
mod id;
mod state;

pub use auth::{authorize, AuthSession, DialogCredential};
pub use dialog_impl::Dialog;
pub use id::DialogId;
pub use state::DialogState;

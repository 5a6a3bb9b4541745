/*!
# infra-common

Horizontal infrastructure shared by every layer of the protocol stack:

- [`lifecycle::GroupLock`] — the reference-counted mutex + destroy-handler
  bundle that guards every long-lived core object (transport, transaction,
  dialog, TURN session, TURN socket).
- [`lifecycle::Component`] — a standard init/start/stop/shutdown lifecycle.
- [`logging`] — tracing setup and a structured per-error log record.
- [`errors`] — a shared error-context type used to annotate `thiserror`
  errors with the component/operation that raised them.
*/

pub mod errors;
pub mod lifecycle;
pub mod logging;

pub use errors::types::Error;
pub use lifecycle::component::{Component, ComponentState};
pub use lifecycle::group_lock::GroupLock;
pub use logging::setup::setup_logging;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn it_builds() {
        assert_eq!(2 + 2, 4);
    }
}

/*!
Lifecycle management.

This module provides the two recurring lifetime idioms used by every
long-lived object in the stack:

- [`component`] — a standard init/start/stop/shutdown state machine for
  coarse-grained subsystems (the endpoint, the transport manager).
- [`group_lock`] — the fine-grained reference-counted mutex used by every
  individual transport, transaction, dialog, TURN session, and TURN socket.
- [`dependency`] — ordering components by their declared dependencies so
  that startup/shutdown happens in a safe order.
*/

pub mod component;
pub mod dependency;
pub mod group_lock;

pub use component::{Component, ComponentState};
pub use dependency::{DependencyError, DependencyGraph};
pub use group_lock::GroupLock; 
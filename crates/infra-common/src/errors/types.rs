use thiserror::Error;

/// A type alias for handling `Result`s with the shared infrastructure [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared across the lifecycle and logging helpers.
///
/// Protocol-specific crates (sip-core, transaction-core, dialog-core,
/// turn-core) define their own richer error enums and only reach for this
/// one when reporting failures in shared infrastructure itself (component
/// startup ordering, group-lock misuse).
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A component was asked to do something before it reached the right
    /// lifecycle state (e.g. `start()` before `init()`).
    #[error("component not ready: {0}")]
    ComponentNotReady(String),

    /// Dependency resolution between components failed.
    #[error("dependency error: {0}")]
    Dependency(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A group-locked object was used after its reference count reached
    /// zero and its destroy handlers ran.
    #[error("object destroyed: {0}")]
    Destroyed(String),

    /// Catch-all for infrastructure errors that don't warrant their own
    /// variant.
    #[error("{0}")]
    Internal(String),

    /// An error annotated with [`ErrorContext`](crate::errors::ErrorContext).
    #[error("{0}")]
    Custom(String),
}

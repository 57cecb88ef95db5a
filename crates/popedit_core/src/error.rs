//! Error types for edit sessions and the active-edit registry.
use thiserror::Error;

/// Failures raised by the shared registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("active edit registry state is poisoned")]
    Poisoned,
}

/// Contract violations raised by [`crate::EditSession`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("reset requested before a revert value was captured")]
    RevertValueUnset,

    #[error("edit session '{0}' is already disposed")]
    Disposed(String),

    #[error("edit session '{0}' was already initialized")]
    AlreadyInitialized(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

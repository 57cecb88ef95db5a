//! Core lifecycle coordination for inline popover edits (sessions, registry, streams).

/// Falsy-value detection and reset resolution policy.
pub mod blank;
/// Multicast notification streams with completion semantics.
pub mod channel;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Session and registry error types.
pub mod error;
/// Form value provider contract and an in-memory implementation.
pub mod provider;
/// Shared registry tracking the single active edit session.
pub mod registry;
/// Deferred "run once stable" scheduling primitives.
pub mod scheduler;
/// The edit session lifecycle object.
pub mod session;

pub use blank::{Blank, ResetPolicy};
pub use channel::{Multicast, Subscription};
pub use config::Config;
pub use constants::*;
pub use error::{EditError, RegistryError};
pub use provider::{FormState, FormValueProvider};
pub use registry::{ActiveChange, ActiveEditRegistry};
pub use scheduler::{StabilizationScheduler, StableRegistration, StableTick, TokioStable};
pub use session::{EditSession, SessionId, SessionPhase, SessionRegistry};

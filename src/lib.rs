//! Root crate facade for popedit: core session types plus a minimal lens host.

/// Lens host that dismantles lenses on registry announcements.
pub mod host;

pub use host::LensHost;
pub use popedit_core::{
    blank, channel, config, constants, error, provider, registry, scheduler, session,
    ActiveChange, ActiveEditRegistry, Blank, Config, EditError, EditSession, FormState,
    FormValueProvider, Multicast, RegistryError, ResetPolicy, SessionId, SessionPhase,
    SessionRegistry, StabilizationScheduler, StableRegistration, StableTick, Subscription,
    TokioStable, LIFECYCLE_TRACE_TARGET,
};

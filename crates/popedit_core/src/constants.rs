//! Shared constants used across popedit crates.

/// Environment variable selecting the reset resolution policy.
pub const RESET_POLICY_ENV: &str = "POPEDIT_RESET_POLICY";

/// Environment flag enabling `info`-level lifecycle traces.
pub const LIFECYCLE_LOG_ENV: &str = "POPEDIT_LIFECYCLE_LOG";

/// Environment variable overriding the demo form's initial value.
pub const DEMO_INITIAL_ENV: &str = "POPEDIT_DEMO_INITIAL";

/// Environment variable supplying a previously saved value for the demo.
pub const DEMO_PREVIOUS_ENV: &str = "POPEDIT_DEMO_PREVIOUS";

/// Default initial value of the demo form.
pub const DEFAULT_DEMO_INITIAL: &str = "foo";

/// Tracing target used for lifecycle traces.
pub const LIFECYCLE_TRACE_TARGET: &str = "popedit::lifecycle";

/// Prefix for generated session ids.
pub const SESSION_ID_PREFIX: &str = "edit";
